//! Business record schemas: the invoice itself and its two parties.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::schema::{FieldSpec, FieldType, RecordSchema};
use crate::error::NfseError;

/// Codes accepted for yes/no style flags (`1` yes, `2` or `0` no).
const FLAG: FieldType = FieldType::OneOf(&["0", "1", "2"]);

/// NFS-e invoice fields.
pub static NOTA: RecordSchema = RecordSchema {
    name: "nota",
    fields: &[
        FieldSpec::required("numero_nfs", FieldType::Text),
        FieldSpec::required("codigo_autenticidade", FieldType::Text),
        FieldSpec::required("data_competencia", FieldType::Text),
        FieldSpec::required("valor_liquido", FieldType::Amount),
        FieldSpec::required("valor_total", FieldType::Amount),
        FieldSpec::required("valor_deducoes", FieldType::Amount),
        FieldSpec::required("valor_pis", FieldType::Amount),
        FieldSpec::required("valor_cofins", FieldType::Amount),
        FieldSpec::required("valor_inss", FieldType::Amount),
        FieldSpec::required("valor_irrf", FieldType::Amount),
        FieldSpec::required("valor_csll", FieldType::Amount),
        FieldSpec::required("valor_issqn", FieldType::Amount),
        FieldSpec::required("base_calculo", FieldType::Amount),
        FieldSpec::required("aliquota", FieldType::Amount),
        FieldSpec::required("issqn_a_reter", FLAG),
        FieldSpec::required("estado", FieldType::Text),
        FieldSpec::required("codigo_tributacao", FieldType::Text),
        FieldSpec::required("discriminacao_servico", FieldType::Text),
        FieldSpec::required("opt_simples_nacional", FLAG),
        FieldSpec::optional("serie", FieldType::Text),
        FieldSpec::optional("nfse_substituida", FieldType::Text),
        FieldSpec::optional("valor_outras_retencoes", FieldType::Amount),
        FieldSpec::optional("data_emissao", FieldType::Date),
        FieldSpec::required("atv_economica", FieldType::Text),
        FieldSpec::required("municipio", FieldType::Text),
    ],
    any_of: &[],
};

const PARTY_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("cpf", FieldType::Text),
    FieldSpec::optional("cnpj", FieldType::Text),
    FieldSpec::required("inscricao_municipal", FieldType::Text),
    FieldSpec::required("razao_social", FieldType::Text),
    FieldSpec::required("endereco", FieldType::Text),
    FieldSpec::required("municipio", FieldType::Text),
    FieldSpec::required("uf", FieldType::Text),
    FieldSpec::required("cep", FieldType::Text),
    FieldSpec::optional("numero", FieldType::Text),
    FieldSpec::optional("bairro", FieldType::Text),
    FieldSpec::optional("telefone", FieldType::Text),
    FieldSpec::optional("email", FieldType::Text),
];

const PARTY_DOCUMENT: &[&[&str]] = &[&["cnpj", "cpf"]];

/// Service taker fields.
pub static TOMADOR: RecordSchema = RecordSchema {
    name: "tomador",
    fields: PARTY_FIELDS,
    any_of: PARTY_DOCUMENT,
};

/// Service provider fields.
pub static PRESTADOR: RecordSchema = RecordSchema {
    name: "prestador",
    fields: PARTY_FIELDS,
    any_of: PARTY_DOCUMENT,
};

/// Which business record a pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Nota,
    Tomador,
    Prestador,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Nota, Self::Tomador, Self::Prestador];

    pub fn schema(&self) -> &'static RecordSchema {
        match self {
            Self::Nota => &NOTA,
            Self::Tomador => &TOMADOR,
            Self::Prestador => &PRESTADOR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.schema().name
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = NfseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| NfseError::Unsupported(format!("record kind '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::FieldMap;

    #[test]
    fn test_schema_sizes() {
        assert_eq!(NOTA.fields.len(), 25);
        assert_eq!(TOMADOR.fields.len(), 12);
        assert_eq!(PRESTADOR.fields.len(), 12);
        assert_eq!(NOTA.optional_fields().count(), 4);
    }

    #[test]
    fn test_party_requires_a_document() {
        let fields = FieldMap::new()
            .with("inscricao_municipal", Some("123"))
            .with("razao_social", Some("ACME LTDA"))
            .with("endereco", Some("Rua A"))
            .with("municipio", Some("2704302"))
            .with("uf", Some("AL"))
            .with("cep", Some("57000000"));

        let err = TOMADOR.validate(fields.clone()).unwrap_err();
        assert!(err.to_string().contains("at least one of [cnpj, cpf]"));

        let record = TOMADOR.validate(fields.with("cpf", Some("12345678901"))).unwrap();
        assert_eq!(record.get("cpf"), Some("12345678901"));
        assert_eq!(record.get("cnpj"), None);
    }

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("nota".parse::<RecordKind>().unwrap(), RecordKind::Nota);
        assert_eq!("Prestador".parse::<RecordKind>().unwrap(), RecordKind::Prestador);
        assert!("fatura".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::Tomador.schema().name, "tomador");
    }
}
