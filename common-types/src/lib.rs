#![no_std]

// Importações completas do MultiversX SC
multiversx_sc::imports!();
multiversx_sc::derive_imports!();

/// Janela de inadimplência por falta de relatório de renda, em unidades de
/// tempo do bloco. O credor só pode decretar inadimplência quando o tempo
/// decorrido desde o último relatório EXCEDE a janela (desigualdade estrita).
pub const MISSED_REPORT_WINDOW: u64 = 100;

// Status do ciclo de vida do empréstimo. Repaid e Defaulted são terminais:
// nenhuma operação transiciona a partir deles.
#[multiversx_sc::derive::type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Eq, Clone, Copy, Debug)]
pub enum LoanStatus {
    Pending,
    Active,
    Repaid,
    Defaulted,
}

// Conjunto fechado de moedas aceitas nos termos do empréstimo (campo
// informativo, não altera a aritmética de repagamento).
#[multiversx_sc::derive::type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Eq, Clone, Copy, Debug)]
pub enum Currency {
    Egld,
    Usd,
}

// Chave estruturada para consulta de benchmark salarial (grau + localização).
// A igualdade vem do PartialEq derivado e a identidade como chave de storage
// vem da forma NestedEncode, sem concatenação de strings.
#[multiversx_sc::derive::type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct DegreeLocationKey<M: ManagedTypeApi> {
    pub degree: ManagedBuffer<M>,
    pub location: ManagedBuffer<M>,
}

// Dados de benchmark de potencial de renda para um par grau/localização
#[multiversx_sc::derive::type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, PartialEq, Clone, Debug)]
pub struct SalaryBenchmark<M: ManagedTypeApi> {
    pub avg_salary: BigUint<M>,
    pub median_salary: BigUint<M>,
    pub confidence: u64,
    pub last_updated: u64,
    pub data_points: u64,
}

// Interface do colaborador externo de benchmark salarial. Consumido apenas
// para semear expectativas iniciais de renda em projeções; não participa da
// máquina de estados de repagamento.
pub trait IEarningBenchmark: multiversx_sc::contract_base::ContractBase {
    // Registra ou atualiza o benchmark de um par grau/localização
    fn update_benchmark(
        &self,
        key: &DegreeLocationKey<Self::Api>,
        avg_salary: BigUint<Self::Api>,
        median_salary: BigUint<Self::Api>,
        confidence: u64,
    );

    // Consulta o benchmark de um par grau/localização
    fn get_benchmark(
        &self,
        key: &DegreeLocationKey<Self::Api>,
    ) -> SalaryBenchmark<Self::Api>;
}
