fn main() {
    multiversx_sc_meta_lib::cli_main::<individual_loan::AbiProvider>();
}
