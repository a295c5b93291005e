// ==========================================================================
// ARQUIVO: integrated_system_test.rs
// Descrição: Testes integrados para os dois contratos de empréstimo por
//            participação de renda implantados lado a lado: o ledger
//            autocontido (IndividualLoan) e o par registro+rastreador
//            (RepaymentTracker)
// ==========================================================================

use multiversx_sc::types::Address;
use multiversx_sc_scenario::{
    managed_address, managed_biguint, rust_biguint,
    testing_framework::{BlockchainStateWrapper, ContractObjWrapper},
    DebugApi,
};

use common_types::{Currency, LoanStatus};
use individual_loan::IndividualLoan;
use repayment_tracker::RepaymentTracker;

const INDIVIDUAL_LOAN_WASM_PATH: &str = "output/individual-loan.wasm";
const REPAYMENT_TRACKER_WASM_PATH: &str = "output/repayment-tracker.wasm";

const DISBURSEMENT_FEE: u64 = 500;

// Estrutura para configuração dos testes integrados
struct IntegratedSystemSetup {
    pub blockchain_wrapper: BlockchainStateWrapper,
    pub owner_address: Address,
    pub authority_address: Address,
    pub borrower_address: Address,
    pub lender_address: Address,
    pub individual_loan_wrapper:
        ContractObjWrapper<individual_loan::ContractObj<DebugApi>, fn() -> individual_loan::ContractObj<DebugApi>>,
    pub repayment_tracker_wrapper:
        ContractObjWrapper<repayment_tracker::ContractObj<DebugApi>, fn() -> repayment_tracker::ContractObj<DebugApi>>,
}

fn individual_loan_obj() -> individual_loan::ContractObj<DebugApi> {
    individual_loan::contract_obj()
}

fn repayment_tracker_obj() -> repayment_tracker::ContractObj<DebugApi> {
    repayment_tracker::contract_obj()
}

// Função de configuração para os testes integrados
fn setup_integrated_system() -> IntegratedSystemSetup {
    let rust_zero = rust_biguint!(0u64);
    let mut blockchain_wrapper = BlockchainStateWrapper::new();

    // Criar contas
    let owner_address = blockchain_wrapper.create_user_account(&rust_biguint!(10_000));
    let authority_address = blockchain_wrapper.create_user_account(&rust_zero);
    let borrower_address = blockchain_wrapper.create_user_account(&rust_biguint!(100_000));
    let lender_address = blockchain_wrapper.create_user_account(&rust_biguint!(100_000));

    // Deploy dos contratos
    let individual_loan_wrapper = blockchain_wrapper.create_sc_account(
        &rust_zero,
        Some(&owner_address),
        individual_loan_obj as fn() -> individual_loan::ContractObj<DebugApi>,
        INDIVIDUAL_LOAN_WASM_PATH,
    );

    let repayment_tracker_wrapper = blockchain_wrapper.create_sc_account(
        &rust_zero,
        Some(&owner_address),
        repayment_tracker_obj as fn() -> repayment_tracker::ContractObj<DebugApi>,
        REPAYMENT_TRACKER_WASM_PATH,
    );

    // Inicialização dos contratos com a mesma autoridade administrativa
    blockchain_wrapper
        .execute_tx(&owner_address, &individual_loan_wrapper, &rust_zero, |sc| {
            sc.init(
                managed_address!(&authority_address),
                5000u64,
                managed_biguint!(DISBURSEMENT_FEE),
            );
        })
        .assert_ok();

    blockchain_wrapper
        .execute_tx(&owner_address, &repayment_tracker_wrapper, &rust_zero, |sc| {
            sc.init(managed_address!(&authority_address), false);
        })
        .assert_ok();

    IntegratedSystemSetup {
        blockchain_wrapper,
        owner_address,
        authority_address,
        borrower_address,
        lender_address,
        individual_loan_wrapper,
        repayment_tracker_wrapper,
    }
}

// Ciclo de vida completo no ledger autocontido: criação, desembolso,
// relatórios e repagamentos até a quitação, com os saldos conferidos
#[test]
fn test_full_lifecycle_individual_loan() {
    let mut setup = setup_integrated_system();
    let borrower = setup.borrower_address.clone();
    let lender = setup.lender_address.clone();

    let mut loan_id = 0u64;
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.owner_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(DISBURSEMENT_FEE),
            |sc| {
                loan_id = sc.create_loan(
                    managed_biguint!(10_000),
                    500u64,
                    100u64,
                    managed_biguint!(50_000),
                    10u64,
                    managed_address!(&borrower),
                    managed_address!(&lender),
                    managed_biguint!(100),
                    360u64,
                    Currency::Egld,
                );
            },
        )
        .assert_ok();

    setup
        .blockchain_wrapper
        .check_egld_balance(&setup.authority_address, &rust_biguint!(DISBURSEMENT_FEE));

    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.lender_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(10_000),
            |sc| {
                sc.disburse_loan(loan_id);
            },
        )
        .assert_ok();

    setup
        .blockchain_wrapper
        .check_egld_balance(&setup.borrower_address, &rust_biguint!(110_000));

    // Primeiro ciclo: renda 60000 gera repagamento de 1000
    setup.blockchain_wrapper.set_block_timestamp(101);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.report_income(loan_id, managed_biguint!(60_000));
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(1_000),
            |sc| {
                sc.trigger_repayment(loan_id);
            },
        )
        .assert_ok();

    // Segundo ciclo: renda 145000 completa os 10500 devidos
    setup.blockchain_wrapper.set_block_timestamp(150);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.report_income(loan_id, managed_biguint!(145_000));
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(9_500),
            |sc| {
                sc.trigger_repayment(loan_id);
            },
        )
        .assert_ok();

    setup
        .blockchain_wrapper
        .execute_query(&setup.individual_loan_wrapper, |sc| {
            let loan = sc.loans(loan_id).get();
            assert_eq!(loan.repaid, managed_biguint!(10_500));
            assert_eq!(loan.status, LoanStatus::Repaid);
        })
        .assert_ok();

    // Credor: -10000 do desembolso, +10500 dos repagamentos
    setup
        .blockchain_wrapper
        .check_egld_balance(&setup.lender_address, &rust_biguint!(100_500));
    // Tomador: +10000 do desembolso, -10500 dos repagamentos
    setup
        .blockchain_wrapper
        .check_egld_balance(&setup.borrower_address, &rust_biguint!(99_500));
}

// O par registro+rastreador: a autoridade espelha a originação no rastreador
// e o tomador percorre relatório-execução até a quitação
#[test]
fn test_registry_tracker_pair_flow() {
    let mut setup = setup_integrated_system();
    let borrower = setup.borrower_address.clone();
    let lender = setup.lender_address.clone();

    let loan_id = 42u64;
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.authority_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.initialize_loan(
                    loan_id,
                    managed_biguint!(10_000),
                    500u64,
                    100u64,
                    managed_biguint!(50_000),
                    10u64,
                    managed_address!(&borrower),
                    managed_address!(&lender),
                    Currency::Egld,
                );
            },
        )
        .assert_ok();

    // Ciclo 1: renda 70000 gera 2000; o relatório é consumido
    setup.blockchain_wrapper.set_block_timestamp(101);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.report_income(loan_id, managed_biguint!(70_000));
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(2_000),
            |sc| {
                sc.execute_repayment(loan_id, 1u64);
            },
        )
        .assert_ok();

    // Sem relatório novo o ciclo 2 não executa
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.execute_repayment(loan_id, 2u64);
            },
        )
        .assert_error(4, "No income report found");

    // Ciclo 2: renda 135000 completa os 10500 devidos
    setup.blockchain_wrapper.set_block_timestamp(150);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.report_income(loan_id, managed_biguint!(135_000));
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(8_500),
            |sc| {
                sc.execute_repayment(loan_id, 2u64);
            },
        )
        .assert_ok();

    setup
        .blockchain_wrapper
        .execute_query(&setup.repayment_tracker_wrapper, |sc| {
            let state = sc.loan_states(loan_id).get();
            assert_eq!(state.repaid, managed_biguint!(10_500));
            assert_eq!(state.status, LoanStatus::Repaid);
            // Os dois ciclos ficaram registrados de forma imutável
            assert_eq!(
                sc.repayments(loan_id, 1u64).get().amount,
                managed_biguint!(2_000)
            );
            assert_eq!(
                sc.repayments(loan_id, 2u64).get().amount,
                managed_biguint!(8_500)
            );
        })
        .assert_ok();

    setup
        .blockchain_wrapper
        .check_egld_balance(&setup.lender_address, &rust_biguint!(110_500));
}

// Caminho de inadimplência nos dois contratos: relatórios param e o credor
// decreta a perda depois da janela estrita
#[test]
fn test_default_flows_on_both_contracts() {
    let mut setup = setup_integrated_system();
    let borrower = setup.borrower_address.clone();
    let lender = setup.lender_address.clone();

    // Ledger autocontido
    let mut loan_id = 0u64;
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.owner_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(DISBURSEMENT_FEE),
            |sc| {
                loan_id = sc.create_loan(
                    managed_biguint!(10_000),
                    500u64,
                    100u64,
                    managed_biguint!(50_000),
                    10u64,
                    managed_address!(&borrower),
                    managed_address!(&lender),
                    managed_biguint!(100),
                    360u64,
                    Currency::Egld,
                );
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.lender_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(10_000),
            |sc| {
                sc.disburse_loan(loan_id);
            },
        )
        .assert_ok();

    // Rastreador com o mesmo perfil de termos
    let tracker_loan_id = 42u64;
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.authority_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.initialize_loan(
                    tracker_loan_id,
                    managed_biguint!(10_000),
                    500u64,
                    100u64,
                    managed_biguint!(50_000),
                    10u64,
                    managed_address!(&borrower),
                    managed_address!(&lender),
                    Currency::Egld,
                );
            },
        )
        .assert_ok();

    // Único relatório nos dois, depois silêncio
    setup.blockchain_wrapper.set_block_timestamp(101);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.report_income(loan_id, managed_biguint!(60_000));
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.borrower_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.report_income(tracker_loan_id, managed_biguint!(60_000));
            },
        )
        .assert_ok();

    // Na borda da janela a inadimplência ainda não pode ser decretada
    setup.blockchain_wrapper.set_block_timestamp(201);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.lender_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.default_loan(loan_id);
            },
        )
        .assert_error(4, "Reporting window has not elapsed");

    // Depois da janela os dois contratos convergem para defaulted
    setup.blockchain_wrapper.set_block_timestamp(202);
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.lender_address,
            &setup.individual_loan_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.default_loan(loan_id);
            },
        )
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_tx(
            &setup.lender_address,
            &setup.repayment_tracker_wrapper,
            &rust_biguint!(0u64),
            |sc| {
                sc.mark_default(tracker_loan_id);
            },
        )
        .assert_ok();

    setup
        .blockchain_wrapper
        .execute_query(&setup.individual_loan_wrapper, |sc| {
            assert_eq!(sc.loans(loan_id).get().status, LoanStatus::Defaulted);
        })
        .assert_ok();
    setup
        .blockchain_wrapper
        .execute_query(&setup.repayment_tracker_wrapper, |sc| {
            assert_eq!(
                sc.loan_states(tracker_loan_id).get().status,
                LoanStatus::Defaulted
            );
        })
        .assert_ok();
}
