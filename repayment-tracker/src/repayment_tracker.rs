// ==========================================================================
// MÓDULO: repayment-tracker/src/repayment_tracker.rs
// Descrição: Contrato rastreador de repagamentos, a metade desacoplada do
//            par registro+rastreador. Uma autoridade (o registro) inicializa
//            o estado de cada empréstimo; o tomador reporta renda e consome
//            o relatório ao executar o repagamento do ciclo, que é apagado
//            para forçar um relatório novo antes do próximo ciclo. Cada
//            repagamento executado vira um registro imutável por
//            (empréstimo, ciclo).
// ==========================================================================

#![no_std]

multiversx_sc::imports!();
multiversx_sc::derive_imports!();

use common_types::{Currency, LoanStatus, MISSED_REPORT_WINDOW};

#[multiversx_sc::contract]
pub trait RepaymentTracker {
    // ============================
    // Inicialização e configuração
    // ============================

    /// Inicializa o contrato com a autoridade (o principal do registro) e a
    /// política de unicidade do número de ciclo fornecido pelo chamador.
    /// Com enforce_unique_cycles desligado vale o comportamento original:
    /// um ciclo repetido sobrescreve o registro anterior.
    #[init]
    fn init(&self, authority: ManagedAddress, enforce_unique_cycles: bool) {
        require!(!authority.is_zero(), "Authority address cannot be zero");
        self.authority().set(authority);
        self.enforce_unique_cycles().set(enforce_unique_cycles);
    }

    // Transfere o papel de autoridade; apenas a autoridade atual pode chamar
    #[endpoint(setAuthority)]
    fn set_authority(&self, new_authority: ManagedAddress) {
        let caller = self.blockchain().get_caller();
        require!(
            caller == self.authority().get(),
            "Only authority can update configuration"
        );
        require!(!new_authority.is_zero(), "Authority address cannot be zero");
        let previous = self.authority().get();
        self.authority().set(new_authority.clone());
        self.authority_changed_event(previous, new_authority);
    }

    // ============================
    // Registro de empréstimos
    // ============================

    /// Registra o estado de um empréstimo já originado no lado do registro.
    /// O identificador é fornecido pelo chamador e o estado nasce ativo; a
    /// validação de originação (taxa, carência, partes) pertence ao registro.
    #[endpoint(initializeLoan)]
    #[allow(clippy::too_many_arguments)]
    fn initialize_loan(
        &self,
        loan_id: u64,
        principal: BigUint,
        interest_rate: u64,
        grace_period: u64,
        income_threshold: BigUint,
        repayment_percentage: u64,
        borrower: ManagedAddress,
        lender: ManagedAddress,
        currency: Currency,
    ) {
        let caller = self.blockchain().get_caller();
        require!(
            caller == self.authority().get(),
            "Only authority can initialize loan"
        );
        require!(
            self.loan_states(loan_id).is_empty(),
            "Loan already initialized"
        );
        require!(
            repayment_percentage > 0 && repayment_percentage <= 100,
            "Invalid repayment percentage"
        );

        let interest_amount = &principal * &BigUint::from(interest_rate) / &BigUint::from(10000u32);
        let total_due = &principal + &interest_amount;
        let current_timestamp = self.blockchain().get_block_timestamp();

        self.loan_states(loan_id).set(LoanState {
            principal,
            total_due,
            repaid: BigUint::zero(),
            status: LoanStatus::Active,
            grace_until: current_timestamp + grace_period,
            borrower: borrower.clone(),
            lender: lender.clone(),
            currency,
            income_threshold,
            repayment_percentage,
            last_report_time: 0,
        });

        self.loan_initialized_event(loan_id, borrower, lender);
    }

    // ============================
    // Relatório de renda
    // ============================

    /// Registra a renda do ciclo corrente. Diferente da variante
    /// autocontida, um relatório pendente bloqueia novos relatórios até ser
    /// consumido pelo repagamento. Os termos vigentes (limiar e percentual)
    /// são congelados no relatório: uma revisão posterior não altera o valor
    /// devido por um relatório já registrado.
    #[endpoint(reportIncome)]
    fn report_income(&self, loan_id: u64, income: BigUint) {
        require!(!self.loan_states(loan_id).is_empty(), "Loan does not exist");

        let mut state = self.loan_states(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(caller == state.borrower, "Only borrower can report income");
        require!(state.status == LoanStatus::Active, "Loan is not active");
        require!(
            self.income_reports(loan_id).is_empty(),
            "Income report already pending"
        );

        let current_timestamp = self.blockchain().get_block_timestamp();
        require!(
            current_timestamp >= state.grace_until,
            "Grace period not over"
        );
        require!(income > BigUint::zero(), "Invalid income");

        self.income_reports(loan_id).set(IncomeReport {
            income: income.clone(),
            reported_at: current_timestamp,
            verified: true,
            threshold: state.income_threshold.clone(),
            percentage: state.repayment_percentage,
        });
        state.last_report_time = current_timestamp;
        self.loan_states(loan_id).set(state);

        self.income_reported_event(loan_id, caller, &income);
    }

    // ============================
    // Execução de repagamento
    // ============================

    /// Consome o relatório pendente e executa o repagamento do ciclo. O
    /// número do ciclo é escolhido pelo chamador; a sequência nunca é
    /// validada e a unicidade só quando configurada na implantação. O valor
    /// anexado deve ser exatamente floor((renda - limiar) * percentual / 100)
    /// sobre os termos congelados no relatório, com teto rígido em total_due.
    /// No sucesso o relatório é apagado, forçando um novo antes do próximo
    /// ciclo, e o repagamento é devolvido ao chamador.
    #[payable("*")]
    #[endpoint(executeRepayment)]
    fn execute_repayment(&self, loan_id: u64, cycle: u64) -> BigUint {
        require!(!self.loan_states(loan_id).is_empty(), "Loan does not exist");
        require!(
            !self.income_reports(loan_id).is_empty(),
            "No income report found"
        );

        let mut state = self.loan_states(loan_id).get();
        let report = self.income_reports(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(
            caller == state.borrower,
            "Only borrower can execute repayment"
        );
        require!(state.status == LoanStatus::Active, "Loan is not active");
        require!(report.income > report.threshold, "Income below threshold");

        let excess = &report.income - &report.threshold;
        let repay_amount = &excess * &BigUint::from(report.percentage) / &BigUint::from(100u32);
        let new_repaid = &state.repaid + &repay_amount;
        require!(
            new_repaid <= state.total_due,
            "Repayment would exceed total due"
        );
        if self.enforce_unique_cycles().get() {
            require!(
                self.repayments(loan_id, cycle).is_empty(),
                "Repayment cycle already recorded"
            );
        }

        let payment = self.call_value().egld_or_single_esdt();
        require!(
            payment.amount == repay_amount,
            "Payment does not match repayment amount"
        );
        self.send().direct(
            &state.lender,
            &payment.token_identifier,
            payment.token_nonce,
            &payment.amount,
        );

        let current_timestamp = self.blockchain().get_block_timestamp();
        self.repayments(loan_id, cycle).set(RepaymentRecord {
            amount: repay_amount.clone(),
            paid_at: current_timestamp,
            borrower: caller,
            lender: state.lender.clone(),
        });

        state.repaid = new_repaid;
        if state.repaid >= state.total_due {
            state.status = LoanStatus::Repaid;
            self.loan_fully_repaid_event(loan_id);
        }
        self.loan_states(loan_id).set(state);

        // Consumo do relatório: um ciclo, um relatório
        self.income_reports(loan_id).clear();

        self.repayment_executed_event(loan_id, cycle, &repay_amount);

        repay_amount
    }

    // ============================
    // Monitor de inadimplência
    // ============================

    /// Decreta inadimplência por falta de relatório; a janela é estrita,
    /// em exatamente cem unidades decorridas a chamada ainda falha.
    #[endpoint(markDefault)]
    fn mark_default(&self, loan_id: u64) {
        require!(!self.loan_states(loan_id).is_empty(), "Loan does not exist");

        let mut state = self.loan_states(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(caller == state.lender, "Only lender can mark default");
        require!(state.status == LoanStatus::Active, "Loan is not active");

        let current_timestamp = self.blockchain().get_block_timestamp();
        require!(
            current_timestamp - state.last_report_time > MISSED_REPORT_WINDOW,
            "Reporting window has not elapsed"
        );

        state.status = LoanStatus::Defaulted;
        self.loan_states(loan_id).set(state);

        self.loan_defaulted_event(loan_id);
    }

    // ============================
    // Revisão de termos
    // ============================

    /// Revisa limiar e percentual. Sem restrição de status, e sem efeito
    /// sobre um relatório já pendente (que carrega os termos congelados).
    /// Grava um registro de auditoria por empréstimo, apenas o mais recente.
    #[endpoint(updateTerms)]
    fn update_terms(&self, loan_id: u64, new_threshold: BigUint, new_percentage: u64) {
        require!(!self.loan_states(loan_id).is_empty(), "Loan does not exist");

        let mut state = self.loan_states(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(caller == state.lender, "Only lender can update terms");
        require!(
            new_percentage > 0 && new_percentage <= 100,
            "Invalid repayment percentage"
        );
        require!(
            new_threshold > BigUint::zero(),
            "Invalid income threshold"
        );

        state.income_threshold = new_threshold.clone();
        state.repayment_percentage = new_percentage;
        self.loan_states(loan_id).set(state);

        let current_timestamp = self.blockchain().get_block_timestamp();
        self.terms_updates(loan_id).set(TermsUpdate {
            new_income_threshold: new_threshold,
            new_repayment_percentage: new_percentage,
            update_timestamp: current_timestamp,
            updater: caller.clone(),
        });

        self.terms_updated_event(loan_id, caller);
    }

    // ============================
    // Views
    // ============================

    #[view(getLoanState)]
    fn get_loan_state(&self, loan_id: u64) -> OptionalValue<LoanState<Self::Api>> {
        if self.loan_states(loan_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.loan_states(loan_id).get())
        }
    }

    #[view(getIncomeReport)]
    fn get_income_report(&self, loan_id: u64) -> OptionalValue<IncomeReport<Self::Api>> {
        if self.income_reports(loan_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.income_reports(loan_id).get())
        }
    }

    #[view(getRepayment)]
    fn get_repayment(&self, loan_id: u64, cycle: u64) -> OptionalValue<RepaymentRecord<Self::Api>> {
        if self.repayments(loan_id, cycle).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.repayments(loan_id, cycle).get())
        }
    }

    #[view(getTermsUpdate)]
    fn get_terms_update(&self, loan_id: u64) -> OptionalValue<TermsUpdate<Self::Api>> {
        if self.terms_updates(loan_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.terms_updates(loan_id).get())
        }
    }

    #[view(getAuthority)]
    fn get_authority(&self) -> ManagedAddress {
        self.authority().get()
    }

    #[view(getEnforceUniqueCycles)]
    fn get_enforce_unique_cycles(&self) -> bool {
        self.enforce_unique_cycles().get()
    }

    // ============================
    // Eventos para auditoria
    // ============================

    #[event("loan_initialized")]
    fn loan_initialized_event(
        &self,
        #[indexed] loan_id: u64,
        #[indexed] borrower: ManagedAddress,
        #[indexed] lender: ManagedAddress,
    );

    #[event("income_reported")]
    fn income_reported_event(
        &self,
        #[indexed] loan_id: u64,
        #[indexed] borrower: ManagedAddress,
        income: &BigUint,
    );

    #[event("repayment_executed")]
    fn repayment_executed_event(
        &self,
        #[indexed] loan_id: u64,
        #[indexed] cycle: u64,
        amount: &BigUint,
    );

    #[event("loan_fully_repaid")]
    fn loan_fully_repaid_event(&self, #[indexed] loan_id: u64);

    #[event("loan_defaulted")]
    fn loan_defaulted_event(&self, #[indexed] loan_id: u64);

    #[event("terms_updated")]
    fn terms_updated_event(&self, #[indexed] loan_id: u64, #[indexed] updater: ManagedAddress);

    #[event("authority_changed")]
    fn authority_changed_event(
        &self,
        #[indexed] previous: ManagedAddress,
        #[indexed] current: ManagedAddress,
    );

    // ============================
    // Storage mappers
    // ============================

    /// Principal do registro, único autorizado a inicializar empréstimos
    #[storage_mapper("authority")]
    fn authority(&self) -> SingleValueMapper<ManagedAddress>;

    /// Política de unicidade do número de ciclo fornecido pelo chamador
    #[storage_mapper("enforce_unique_cycles")]
    fn enforce_unique_cycles(&self) -> SingleValueMapper<bool>;

    #[storage_mapper("loan_states")]
    fn loan_states(&self, loan_id: u64) -> SingleValueMapper<LoanState<Self::Api>>;

    /// No máximo um relatório pendente por empréstimo; apagado ao consumir
    #[storage_mapper("income_reports")]
    fn income_reports(&self, loan_id: u64) -> SingleValueMapper<IncomeReport<Self::Api>>;

    /// Registro imutável de repagamentos executados por (empréstimo, ciclo)
    #[storage_mapper("repayments")]
    fn repayments(&self, loan_id: u64, cycle: u64) -> SingleValueMapper<RepaymentRecord<Self::Api>>;

    /// Auditoria de revisão de termos, apenas a última por empréstimo
    #[storage_mapper("terms_updates")]
    fn terms_updates(&self, loan_id: u64) -> SingleValueMapper<TermsUpdate<Self::Api>>;
}

// Estado rastreado do empréstimo
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct LoanState<M: ManagedTypeApi> {
    pub principal: BigUint<M>,
    pub total_due: BigUint<M>,
    pub repaid: BigUint<M>,
    pub status: LoanStatus,
    pub grace_until: u64,
    pub borrower: ManagedAddress<M>,
    pub lender: ManagedAddress<M>,
    pub currency: Currency,
    pub income_threshold: BigUint<M>,
    pub repayment_percentage: u64,
    pub last_report_time: u64,
}

// Relatório de renda com os termos congelados no momento do registro
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct IncomeReport<M: ManagedTypeApi> {
    pub income: BigUint<M>,
    pub reported_at: u64,
    pub verified: bool,
    pub threshold: BigUint<M>,
    pub percentage: u64,
}

// Registro imutável de um repagamento executado
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct RepaymentRecord<M: ManagedTypeApi> {
    pub amount: BigUint<M>,
    pub paid_at: u64,
    pub borrower: ManagedAddress<M>,
    pub lender: ManagedAddress<M>,
}

// Registro da revisão de termos mais recente
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct TermsUpdate<M: ManagedTypeApi> {
    pub new_income_threshold: BigUint<M>,
    pub new_repayment_percentage: u64,
    pub update_timestamp: u64,
    pub updater: ManagedAddress<M>,
}
