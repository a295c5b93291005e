// ==========================================================================
// MÓDULO: individual-loan/src/individual_loan.rs
// Descrição: Contrato inteligente autocontido de empréstimo por participação
//            de renda na blockchain MultiversX. O credor desembolsa o
//            principal e o tomador repaga um percentual da renda que exceder
//            um limiar, reportada periodicamente após o período de carência.
//            A falta de relatórios permite ao credor decretar inadimplência.
//            O contrato emite eventos para auditoria e rastreamento de ações.
// ==========================================================================

#![no_std]

multiversx_sc::imports!();
multiversx_sc::derive_imports!();

use common_types::{Currency, LoanStatus, MISSED_REPORT_WINDOW};

#[multiversx_sc::contract]
pub trait IndividualLoan {
    // ============================
    // Inicialização e configuração
    // ============================

    /// Inicializa o contrato com a autoridade administrativa, a capacidade
    /// máxima de empréstimos e a taxa de desembolso cobrada na criação.
    /// A autoridade é um valor de configuração explícito; não há singleton.
    #[init]
    fn init(&self, authority: ManagedAddress, max_loans: u64, disbursement_fee: BigUint) {
        require!(!authority.is_zero(), "Authority address cannot be zero");
        require!(max_loans > 0, "Invalid maximum number of loans");
        self.authority().set(authority);
        self.max_loans().set(max_loans);
        self.disbursement_fee().set(disbursement_fee);
    }

    /// Transfere o papel de autoridade. Apenas a autoridade atual pode chamar.
    #[endpoint(setAuthority)]
    fn set_authority(&self, new_authority: ManagedAddress) {
        let caller = self.blockchain().get_caller();
        require!(
            caller == self.authority().get(),
            "Only authority can update configuration"
        );
        require!(!new_authority.is_zero(), "Authority address cannot be zero");
        require!(new_authority != caller, "Authority cannot be the caller");
        let previous = self.authority().get();
        self.authority().set(new_authority.clone());
        self.authority_changed_event(previous, new_authority);
    }

    // Ajusta a capacidade máxima de empréstimos registráveis
    #[endpoint(setMaxLoans)]
    fn set_max_loans(&self, new_max: u64) {
        require!(
            self.blockchain().get_caller() == self.authority().get(),
            "Only authority can update configuration"
        );
        require!(new_max > 0, "Invalid maximum number of loans");
        self.max_loans().set(new_max);
        self.max_loans_changed_event(new_max);
    }

    // Ajusta a taxa de desembolso cobrada do originador na criação
    #[endpoint(setDisbursementFee)]
    fn set_disbursement_fee(&self, new_fee: BigUint) {
        require!(
            self.blockchain().get_caller() == self.authority().get(),
            "Only authority can update configuration"
        );
        self.disbursement_fee().set(&new_fee);
        self.disbursement_fee_changed_event(&new_fee);
    }

    // ============================
    // Registro e desembolso
    // ============================

    /// Cria um empréstimo com status pendente. As validações seguem ordem
    /// fixa e a primeira falha interrompe a chamada; nada é gravado em caso
    /// de erro. A taxa de desembolso anexada é repassada à autoridade e o
    /// identificador do novo empréstimo é devolvido ao chamador.
    #[payable("*")]
    #[endpoint(createLoan)]
    #[allow(clippy::too_many_arguments)]
    fn create_loan(
        &self,
        principal: BigUint,
        interest_rate: u64,
        grace_period: u64,
        income_threshold: BigUint,
        repayment_percentage: u64,
        borrower: ManagedAddress,
        lender_pool: ManagedAddress,
        min_repayment: BigUint,
        max_term: u64,
        currency: Currency,
    ) -> u64 {
        let caller = self.blockchain().get_caller();

        require!(
            self.loan_counter().get() < self.max_loans().get(),
            "Maximum number of loans exceeded"
        );
        require!(
            interest_rate > 0 && interest_rate <= 1000,
            "Invalid interest rate"
        );
        require!(grace_period > 0, "Invalid grace period");
        require!(income_threshold > BigUint::zero(), "Invalid income threshold");
        require!(
            repayment_percentage > 0 && repayment_percentage <= 50,
            "Invalid repayment percentage"
        );
        require!(borrower != caller, "Invalid borrower");
        require!(lender_pool != caller, "Invalid lender");
        require!(min_repayment > BigUint::zero(), "Invalid minimum repayment");
        require!(max_term > 0, "Invalid maximum term");
        require!(!self.authority().is_empty(), "Authority not configured");

        // Cobrança da taxa de desembolso: o valor anexado deve corresponder
        // à taxa configurada e é repassado integralmente à autoridade
        let fee = self.disbursement_fee().get();
        let payment = self.call_value().egld_or_single_esdt();
        require!(
            payment.amount == fee,
            "Payment does not match disbursement fee"
        );
        self.send().direct(
            &self.authority().get(),
            &payment.token_identifier,
            payment.token_nonce,
            &payment.amount,
        );

        // total_due é calculado uma única vez na criação e imutável depois
        let interest_amount = &principal * &BigUint::from(interest_rate) / &BigUint::from(10000u32);
        let total_due = &principal + &interest_amount;

        let loan_id = self.loan_counter().get();
        let current_timestamp = self.blockchain().get_block_timestamp();

        self.loans(loan_id).set(Loan {
            principal,
            interest_rate,
            repaid: BigUint::zero(),
            status: LoanStatus::Pending,
            grace_until: current_timestamp + grace_period,
            income_threshold,
            repayment_percentage,
            borrower: borrower.clone(),
            lender_pool: lender_pool.clone(),
            disbursement_time: 0,
            last_report_time: 0,
            total_due,
            min_repayment,
            max_term,
            currency,
        });
        self.loan_counter().set(loan_id + 1);

        self.loan_created_event(loan_id, borrower, lender_pool);

        loan_id
    }

    /// Desembolsa um empréstimo pendente. Apenas o pool credor pode chamar,
    /// anexando exatamente o principal, que é repassado ao tomador. O status
    /// passa a ativo; uma segunda chamada falha por status.
    #[payable("*")]
    #[endpoint(disburseLoan)]
    fn disburse_loan(&self, loan_id: u64) {
        require!(!self.loans(loan_id).is_empty(), "Loan does not exist");

        let mut loan = self.loans(loan_id).get();
        require!(loan.status == LoanStatus::Pending, "Loan is not pending");

        let caller = self.blockchain().get_caller();
        require!(caller == loan.lender_pool, "Only lender can disburse loan");

        let payment = self.call_value().egld_or_single_esdt();
        require!(
            payment.amount == loan.principal,
            "Payment does not match principal"
        );
        self.send().direct(
            &loan.borrower,
            &payment.token_identifier,
            payment.token_nonce,
            &payment.amount,
        );

        let current_timestamp = self.blockchain().get_block_timestamp();
        loan.status = LoanStatus::Active;
        loan.disbursement_time = current_timestamp;
        self.loans(loan_id).set(loan);

        self.loan_disbursed_event(loan_id, &payment.amount);
    }

    // ============================
    // Relatório de renda
    // ============================

    /// Registra a renda observada do tomador para o ciclo corrente. Este é o
    /// único ponto que aplica o período de carência: relatórios antes do
    /// prazo são rejeitados, nunca enfileirados. Um relatório novo sobrescreve
    /// o anterior e atualiza last_report_time no empréstimo.
    #[endpoint(reportIncome)]
    fn report_income(&self, loan_id: u64, income: BigUint) {
        require!(!self.loans(loan_id).is_empty(), "Loan does not exist");

        let mut loan = self.loans(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(caller == loan.borrower, "Only borrower can report income");
        require!(loan.status == LoanStatus::Active, "Loan is not active");
        require!(income > BigUint::zero(), "Invalid income");

        let current_timestamp = self.blockchain().get_block_timestamp();
        require!(
            current_timestamp >= loan.grace_until,
            "Grace period not over"
        );

        self.income_reports(loan_id).set(IncomeReport {
            reported_income: income.clone(),
            report_time: current_timestamp,
            verified: true,
        });
        loan.last_report_time = current_timestamp;
        self.loans(loan_id).set(loan);

        self.income_reported_event(loan_id, caller, &income);
    }

    // ============================
    // Motor de repagamento
    // ============================

    /// Converte o relatório de renda vigente em um repagamento. Qualquer
    /// chamador pode disparar, anexando exatamente o valor devido no ciclo:
    /// floor((renda - limiar) * percentual / 100). O teto é rígido: se o
    /// acumulado ultrapassasse total_due a chamada falha por inteiro, sem
    /// truncamento. Atingido total_due, o empréstimo transiciona para repaid.
    #[payable("*")]
    #[endpoint(triggerRepayment)]
    fn trigger_repayment(&self, loan_id: u64) {
        require!(!self.loans(loan_id).is_empty(), "Loan does not exist");
        require!(
            !self.income_reports(loan_id).is_empty(),
            "No income report found"
        );

        let mut loan = self.loans(loan_id).get();
        let report = self.income_reports(loan_id).get();
        require!(loan.status == LoanStatus::Active, "Loan is not active");
        require!(
            report.reported_income > loan.income_threshold,
            "Income below threshold"
        );

        let excess = &report.reported_income - &loan.income_threshold;
        let repay_amount =
            &excess * &BigUint::from(loan.repayment_percentage) / &BigUint::from(100u32);
        let new_repaid = &loan.repaid + &repay_amount;
        require!(
            new_repaid <= loan.total_due,
            "Repayment would exceed total due"
        );

        let payment = self.call_value().egld_or_single_esdt();
        require!(
            payment.amount == repay_amount,
            "Payment does not match repayment amount"
        );
        self.send().direct(
            &loan.lender_pool,
            &payment.token_identifier,
            payment.token_nonce,
            &payment.amount,
        );

        loan.repaid = new_repaid;
        if loan.repaid >= loan.total_due {
            loan.status = LoanStatus::Repaid;
            self.loan_fully_repaid_event(loan_id);
        }
        self.loans(loan_id).set(loan);

        self.repayment_triggered_event(loan_id, &repay_amount);
    }

    // ============================
    // Monitor de inadimplência
    // ============================

    /// Decreta inadimplência por falta de relatório. Exige que o tempo
    /// decorrido desde o último relatório exceda estritamente a janela de
    /// cem unidades; em exatamente cem a chamada ainda falha. Sem disparo
    /// automático: o credor invoca explicitamente.
    #[endpoint(defaultLoan)]
    fn default_loan(&self, loan_id: u64) {
        require!(!self.loans(loan_id).is_empty(), "Loan does not exist");

        let mut loan = self.loans(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(caller == loan.lender_pool, "Only lender can default loan");
        require!(loan.status == LoanStatus::Active, "Loan is not active");

        let current_timestamp = self.blockchain().get_block_timestamp();
        require!(
            current_timestamp - loan.last_report_time > MISSED_REPORT_WINDOW,
            "Reporting window has not elapsed"
        );

        loan.status = LoanStatus::Defaulted;
        self.loans(loan_id).set(loan);

        self.loan_defaulted_event(loan_id);
    }

    // ============================
    // Revisão de termos
    // ============================

    /// Revisa os termos mutáveis do empréstimo. Sem restrição de status:
    /// termos podem mudar inclusive dentro da janela de inadimplência. Grava
    /// um único registro de auditoria por empréstimo, sobrescrevendo o
    /// anterior (apenas a última revisão é retida).
    #[endpoint(updateLoan)]
    fn update_loan(
        &self,
        loan_id: u64,
        new_interest_rate: u64,
        new_grace_until: u64,
        new_income_threshold: BigUint,
    ) {
        require!(!self.loans(loan_id).is_empty(), "Loan does not exist");

        let mut loan = self.loans(loan_id).get();
        let caller = self.blockchain().get_caller();
        require!(caller == loan.lender_pool, "Only lender can update loan");
        require!(
            new_interest_rate > 0 && new_interest_rate <= 1000,
            "Invalid interest rate"
        );

        let current_timestamp = self.blockchain().get_block_timestamp();
        require!(
            new_grace_until >= current_timestamp,
            "Grace deadline cannot be in the past"
        );
        require!(
            new_income_threshold > BigUint::zero(),
            "Invalid income threshold"
        );

        loan.interest_rate = new_interest_rate;
        loan.grace_until = new_grace_until;
        loan.income_threshold = new_income_threshold.clone();
        self.loans(loan_id).set(loan);

        self.loan_updates(loan_id).set(LoanUpdate {
            new_interest_rate,
            new_grace_until,
            new_income_threshold,
            update_timestamp: current_timestamp,
            updater: caller.clone(),
        });

        self.loan_updated_event(loan_id, caller);
    }

    // ============================
    // Views
    // ============================

    // Total de empréstimos criados com sucesso desde a implantação
    #[view(getLoanCount)]
    fn get_loan_count(&self) -> u64 {
        self.loan_counter().get()
    }

    #[view(getLoan)]
    fn get_loan(&self, loan_id: u64) -> OptionalValue<Loan<Self::Api>> {
        if self.loans(loan_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.loans(loan_id).get())
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

    #[view(getLoanUpdate)]
    fn get_loan_update(&self, loan_id: u64) -> OptionalValue<LoanUpdate<Self::Api>> {
        if self.loan_updates(loan_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.loan_updates(loan_id).get())
        }
    }

    #[view(getAuthority)]
    fn get_authority(&self) -> ManagedAddress {
        self.authority().get()
    }

    #[view(getMaxLoans)]
    fn get_max_loans(&self) -> u64 {
        self.max_loans().get()
    }

    #[view(getDisbursementFee)]
    fn get_disbursement_fee(&self) -> BigUint {
        self.disbursement_fee().get()
    }

    // ============================
    // Eventos para auditoria
    // ============================

    #[event("loan_created")]
    fn loan_created_event(
        &self,
        #[indexed] loan_id: u64,
        #[indexed] borrower: ManagedAddress,
        #[indexed] lender_pool: ManagedAddress,
    );

    #[event("loan_disbursed")]
    fn loan_disbursed_event(&self, #[indexed] loan_id: u64, amount: &BigUint);

    #[event("income_reported")]
    fn income_reported_event(
        &self,
        #[indexed] loan_id: u64,
        #[indexed] borrower: ManagedAddress,
        income: &BigUint,
    );

    #[event("repayment_triggered")]
    fn repayment_triggered_event(&self, #[indexed] loan_id: u64, amount: &BigUint);

    #[event("loan_fully_repaid")]
    fn loan_fully_repaid_event(&self, #[indexed] loan_id: u64);

    #[event("loan_defaulted")]
    fn loan_defaulted_event(&self, #[indexed] loan_id: u64);

    #[event("loan_updated")]
    fn loan_updated_event(&self, #[indexed] loan_id: u64, #[indexed] updater: ManagedAddress);

    #[event("authority_changed")]
    fn authority_changed_event(
        &self,
        #[indexed] previous: ManagedAddress,
        #[indexed] current: ManagedAddress,
    );

    #[event("max_loans_changed")]
    fn max_loans_changed_event(&self, #[indexed] new_max: u64);

    #[event("disbursement_fee_changed")]
    fn disbursement_fee_changed_event(&self, new_fee: &BigUint);

    // ============================
    // Storage mappers
    // ============================

    /// Autoridade administrativa que recebe as taxas de desembolso
    #[storage_mapper("authority")]
    fn authority(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("max_loans")]
    fn max_loans(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("disbursement_fee")]
    fn disbursement_fee(&self) -> SingleValueMapper<BigUint>;

    /// Identificador do próximo empréstimo; também conta as criações
    #[storage_mapper("loan_counter")]
    fn loan_counter(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("loans")]
    fn loans(&self, loan_id: u64) -> SingleValueMapper<Loan<Self::Api>>;

    /// No máximo um relatório vivo por empréstimo; sobrescrito a cada ciclo
    #[storage_mapper("income_reports")]
    fn income_reports(&self, loan_id: u64) -> SingleValueMapper<IncomeReport<Self::Api>>;

    /// Auditoria de revisão de termos, apenas a última por empréstimo
    #[storage_mapper("loan_updates")]
    fn loan_updates(&self, loan_id: u64) -> SingleValueMapper<LoanUpdate<Self::Api>>;
}

// Dados do empréstimo
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct Loan<M: ManagedTypeApi> {
    pub principal: BigUint<M>,
    pub interest_rate: u64,
    pub repaid: BigUint<M>,
    pub status: LoanStatus,
    pub grace_until: u64,
    pub income_threshold: BigUint<M>,
    pub repayment_percentage: u64,
    pub borrower: ManagedAddress<M>,
    pub lender_pool: ManagedAddress<M>,
    pub disbursement_time: u64,
    pub last_report_time: u64,
    pub total_due: BigUint<M>,
    pub min_repayment: BigUint<M>,
    pub max_term: u64,
    pub currency: Currency,
}

// Observação de renda do ciclo corrente
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct IncomeReport<M: ManagedTypeApi> {
    pub reported_income: BigUint<M>,
    pub report_time: u64,
    pub verified: bool,
}

// Registro da revisão de termos mais recente
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct LoanUpdate<M: ManagedTypeApi> {
    pub new_interest_rate: u64,
    pub new_grace_until: u64,
    pub new_income_threshold: BigUint<M>,
    pub update_timestamp: u64,
    pub updater: ManagedAddress<M>,
}
