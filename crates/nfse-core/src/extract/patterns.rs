//! Regex patterns for NFS-e text layouts.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Generic tokens
    pub static ref LONG_NUMBER: Regex = Regex::new(r"\d{5,}").unwrap();

    pub static ref NUMBER_TOKEN: Regex = Regex::new(r"[\d.,]+").unwrap();

    pub static ref LEADING_NUMBER: Regex = Regex::new(r"^([\d.,]+)").unwrap();

    pub static ref LEADING_DIGITS: Regex = Regex::new(r"^(\d+)").unwrap();

    // Invoice header
    pub static ref CODIGO_VERIFICACAO: Regex = Regex::new(
        r"Código de Verificação:\s*([A-Z0-9-]+)"
    ).unwrap();

    pub static ref COMPETENCIA: Regex = Regex::new(
        r"(?s)Nota Fiscal.*?([A-Z]{3}/\d{4})"
    ).unwrap();

    // Totals and taxes
    pub static ref VALOR_TOTAL: Regex = Regex::new(
        r"VALOR TOTAL DA NOTA = R\$ ([\d.,]+)"
    ).unwrap();

    pub static ref OUTRAS_RETENCOES: Regex = Regex::new(
        r"Outras Retenções\(R\$\)\s*([\d.,]+)"
    ).unwrap();

    pub static ref ISS_RETIDO: Regex = Regex::new(
        r"(?i)ISS\s+Retido:\s*(SIM|N[ÃA]O)"
    ).unwrap();

    // Service
    pub static ref CODIGO_CNAE: Regex = Regex::new(r"Código CNAE:\s*(\d+)").unwrap();

    pub static ref DISCRIMINACAO: Regex = Regex::new(
        r"(?s)DISCRIMINAÇÃO DOS SERVIÇOS\s*(.*?)VALOR TOTAL DA NOTA"
    ).unwrap();

    pub static ref CIDADE_UF: Regex = Regex::new(r"([A-ZÇÃÕÁÉÍÓÚ]+) - [A-Z]{2}").unwrap();

    // Party blocks
    pub static ref CPF_CNPJ: Regex = Regex::new(
        r"CPF/CNPJ:\s*(\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2})"
    ).unwrap();

    pub static ref INSCRICAO_MUNICIPAL: Regex = Regex::new(
        r"Inscrição Municipal:\s*(\d+)"
    ).unwrap();

    pub static ref RAZAO_SOCIAL: Regex = Regex::new(r"Nome/Razão Social:\s*([^\n]+)").unwrap();

    pub static ref ENDERECO: Regex = Regex::new(r"Endereço:\s*([^\n]+)").unwrap();

    pub static ref MUNICIPIO: Regex = Regex::new(
        r"Municipio:\s*([A-ZÇÃÕÁÉÍÓÚ ]+)\s*UF:"
    ).unwrap();

    pub static ref UF: Regex = Regex::new(r"UF:\s*([A-Z]{2})").unwrap();

    pub static ref CEP: Regex = Regex::new(r"CEP:\s*(\d{8})").unwrap();

    pub static ref TELEFONE: Regex = Regex::new(r"TEL:\s*(\d+)").unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"E-mail:\s*([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})"
    ).unwrap();
}

/// First capture group of `pattern` in `text`.
pub fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Capitalize the first letter of every word, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture() {
        assert_eq!(
            capture(&CPF_CNPJ, "CPF/CNPJ: 12.345.678/0001-90 Inscrição"),
            Some("12.345.678/0001-90".to_string())
        );
        assert_eq!(capture(&CEP, "CEP: 5700"), None);
    }

    #[test]
    fn test_iss_retido_is_a_real_pattern() {
        let caps = ISS_RETIDO.captures("ISS  Retido:   Não").unwrap();
        assert_eq!(&caps[1], "Não");
        assert!(ISS_RETIDO.is_match("iss retido: sim"));
        assert!(!ISS_RETIDO.is_match(r"ISS Retido:\s*SIM"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("PENEDO"), "Penedo");
        assert_eq!(title_case("SÃO MIGUEL DOS CAMPOS"), "São Miguel Dos Campos");
        assert_eq!(title_case(""), "");
    }
}
