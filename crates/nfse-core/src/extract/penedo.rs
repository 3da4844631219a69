//! Penedo NFS-e extractors (PDF text layout).
//!
//! Values in the tax table sit on the line below their label; each label's
//! value is picked by its position among the numbers on that line.

use std::marker::PhantomData;

use regex::Regex;

use super::patterns::{
    capture, title_case, CEP, CIDADE_UF, CODIGO_CNAE, CODIGO_VERIFICACAO, COMPETENCIA, CPF_CNPJ,
    DISCRIMINACAO, EMAIL, ENDERECO, INSCRICAO_MUNICIPAL, ISS_RETIDO, LEADING_DIGITS,
    LEADING_NUMBER, LONG_NUMBER, MUNICIPIO, NUMBER_TOKEN, OUTRAS_RETENCOES, RAZAO_SOCIAL,
    TELEFONE, UF, VALOR_TOTAL,
};
use super::{ExtractMethod, ExtractResult, FieldExtractor};
use crate::error::ExtractFailure;
use crate::extract_methods;
use crate::models::business::{NOTA, PRESTADOR, TOMADOR};
use crate::models::file::{FileExtension, SourceFile};
use crate::models::schema::RecordSchema;
use crate::pdf::TextDocument;

const TOMADOR_HEADER: &str = "TOMADOR DE SERVIÇOS";

fn text(doc: &TextDocument) -> Result<&str, ExtractFailure> {
    Ok(doc.text()?)
}

/// Invoice fields of a Penedo NFS-e.
pub struct PenedoNota {
    doc: TextDocument,
}

impl PenedoNota {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            doc: TextDocument::from_text(text),
        }
    }

    fn find(&self, pattern: &Regex) -> ExtractResult {
        Ok(capture(pattern, text(&self.doc)?))
    }

    /// The `index`-th number on the line below the first `label` line that has enough numbers.
    fn number_below(&self, label: &str, index: usize) -> ExtractResult {
        let lines: Vec<&str> = text(&self.doc)?.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            if !line.contains(label) {
                continue;
            }
            let Some(values) = lines.get(i + 1) else {
                continue;
            };
            if let Some(m) = NUMBER_TOKEN.find_iter(values).nth(index) {
                return Ok(Some(m.as_str().to_string()));
            }
        }

        Ok(None)
    }

    fn numero_nfs(&self) -> ExtractResult {
        let lines: Vec<&str> = text(&self.doc)?.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            if line.contains("Número da Nota:") {
                let found = lines
                    .iter()
                    .skip(i + 1)
                    .take(3)
                    .find_map(|next| LONG_NUMBER.find(next));
                if let Some(m) = found {
                    return Ok(Some(m.as_str().to_string()));
                }
            }
        }

        Ok(None)
    }

    fn codigo_autenticidade(&self) -> ExtractResult {
        self.find(&CODIGO_VERIFICACAO)
    }

    fn data_competencia(&self) -> ExtractResult {
        self.find(&COMPETENCIA)
    }

    fn valor_liquido(&self) -> ExtractResult {
        let lines: Vec<&str> = text(&self.doc)?.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            if line.contains("Valor Liquido (R$)") {
                if let Some(value) = lines.get(i + 1).and_then(|next| capture(&LEADING_NUMBER, next)) {
                    return Ok(Some(value));
                }
            }
        }

        Ok(None)
    }

    fn valor_total(&self) -> ExtractResult {
        self.find(&VALOR_TOTAL)
    }

    fn valor_deducoes(&self) -> ExtractResult {
        self.number_below("Valor Liquido (R$)", 1)
    }

    fn valor_pis(&self) -> ExtractResult {
        self.number_below("PIS (R$)", 2)
    }

    fn valor_cofins(&self) -> ExtractResult {
        self.number_below("COFINS (R$)", 0)
    }

    fn valor_inss(&self) -> ExtractResult {
        self.number_below("INSS (R$)", 1)
    }

    fn valor_irrf(&self) -> ExtractResult {
        self.number_below("IRRF (R$)", 4)
    }

    fn valor_csll(&self) -> ExtractResult {
        self.number_below("CSLL (R$)", 3)
    }

    fn valor_issqn(&self) -> ExtractResult {
        let lines: Vec<&str> = text(&self.doc)?.lines().collect();

        // Only the first "Valor do ISS" label counts
        let value = lines
            .iter()
            .position(|line| line.contains("Valor do ISS"))
            .and_then(|i| lines.get(i + 1))
            .and_then(|next| next.split_whitespace().nth(4))
            .map(str::to_string);

        Ok(value)
    }

    fn base_calculo(&self) -> ExtractResult {
        self.number_below("Base de Cálculo (R$)", 2)
    }

    fn aliquota(&self) -> ExtractResult {
        self.number_below("Alíquota (%)", 3)
    }

    fn issqn_a_reter(&self) -> ExtractResult {
        let flag = ISS_RETIDO.captures(text(&self.doc)?).map(|caps| {
            if caps[1].eq_ignore_ascii_case("SIM") {
                "1".to_string()
            } else {
                "0".to_string()
            }
        });
        Ok(flag)
    }

    fn estado(&self) -> ExtractResult {
        self.find(&UF)
    }

    fn codigo_tributacao(&self) -> ExtractResult {
        self.find(&CODIGO_CNAE)
    }

    fn discriminacao_servico(&self) -> ExtractResult {
        Ok(capture(&DISCRIMINACAO, text(&self.doc)?).map(|s| s.trim().to_string()))
    }

    fn opt_simples_nacional(&self) -> ExtractResult {
        let text = text(&self.doc)?;
        let flag = if text.contains("Optante pelo Simples Nacional") {
            Some("1")
        } else if text.contains("Não optante pelo Simples Nacional") {
            Some("0")
        } else {
            None
        };
        Ok(flag.map(str::to_string))
    }

    fn serie(&self) -> ExtractResult {
        Ok(None)
    }

    fn nfse_substituida(&self) -> ExtractResult {
        Ok(None)
    }

    fn valor_outras_retencoes(&self) -> ExtractResult {
        self.find(&OUTRAS_RETENCOES)
    }

    fn data_emissao(&self) -> ExtractResult {
        let lines: Vec<&str> = text(&self.doc)?.lines().collect();

        let value = lines
            .iter()
            .position(|line| line.contains("Data e Hora Emissão"))
            .and_then(|i| lines.get(i + 2))
            .map(|line| line.trim().to_string());

        Ok(value)
    }

    fn atv_economica(&self) -> ExtractResult {
        let text = text(&self.doc)?;
        let mut lines = text.lines().skip_while(|line| !line.contains("Código CNAE:"));

        // The second non-empty line after the CNAE label
        lines.next();
        let value = lines
            .filter(|line| !line.trim().is_empty())
            .nth(1)
            .and_then(|line| capture(&LEADING_DIGITS, line.trim()));

        Ok(value)
    }

    fn municipio(&self) -> ExtractResult {
        let lines: Vec<&str> = text(&self.doc)?.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            if line.contains("Município de Incidência do ISS:") {
                let found = lines
                    .iter()
                    .skip(i + 1)
                    .take(2)
                    .find_map(|next| capture(&CIDADE_UF, next));
                if let Some(city) = found {
                    return Ok(Some(title_case(&city)));
                }
            }
        }

        Ok(None)
    }
}

impl FieldExtractor for PenedoNota {
    const NAME: &'static str = "PenedoNotaExtractor";

    fn schema() -> &'static RecordSchema {
        &NOTA
    }

    fn extension() -> FileExtension {
        FileExtension::Pdf
    }

    fn open(file: &SourceFile) -> Self {
        Self {
            doc: TextDocument::open(&file.path),
        }
    }

    fn extract_methods() -> Vec<ExtractMethod<Self>> {
        extract_methods![
            numero_nfs => Self::numero_nfs,
            codigo_autenticidade => Self::codigo_autenticidade,
            data_competencia => Self::data_competencia,
            valor_liquido => Self::valor_liquido,
            valor_total => Self::valor_total,
            valor_deducoes => Self::valor_deducoes,
            valor_pis => Self::valor_pis,
            valor_cofins => Self::valor_cofins,
            valor_inss => Self::valor_inss,
            valor_irrf => Self::valor_irrf,
            valor_csll => Self::valor_csll,
            valor_issqn => Self::valor_issqn,
            base_calculo => Self::base_calculo,
            aliquota => Self::aliquota,
            issqn_a_reter => Self::issqn_a_reter,
            estado => Self::estado,
            codigo_tributacao => Self::codigo_tributacao,
            discriminacao_servico => Self::discriminacao_servico,
            opt_simples_nacional => Self::opt_simples_nacional,
            serie => Self::serie,
            nfse_substituida => Self::nfse_substituida,
            valor_outras_retencoes => Self::valor_outras_retencoes,
            data_emissao => Self::data_emissao,
            atv_economica => Self::atv_economica,
            municipio => Self::municipio,
        ]
    }
}

/// Which party block of the layout to read.
pub trait PenedoBlock: 'static {
    const NAME: &'static str;

    fn schema() -> &'static RecordSchema;

    /// Value of `pattern` on lines containing `trigger` within this block.
    fn find(text: &str, trigger: &str, pattern: &Regex) -> Option<String>;

    /// The block's CPF/CNPJ.
    fn find_document(text: &str) -> Option<String> {
        Self::find(text, "CPF/CNPJ", &CPF_CNPJ)
    }
}

/// The service taker block, from the tomador header to the end of the text.
pub struct TomadorBlock;

impl TomadorBlock {
    fn lines(text: &str) -> impl Iterator<Item = &str> {
        text.lines().skip_while(|line| !line.contains(TOMADOR_HEADER))
    }
}

impl PenedoBlock for TomadorBlock {
    const NAME: &'static str = "PenedoTomadorExtractor";

    fn schema() -> &'static RecordSchema {
        &TOMADOR
    }

    /// Later lines win.
    fn find(text: &str, trigger: &str, pattern: &Regex) -> Option<String> {
        Self::lines(text)
            .filter(|line| line.contains(trigger))
            .filter_map(|line| capture(pattern, line))
            .last()
    }

    fn find_document(text: &str) -> Option<String> {
        Self::lines(text)
            .filter(|line| line.contains("CPF/CNPJ"))
            .find_map(|line| capture(&CPF_CNPJ, line))
    }
}

/// The service provider block, which leads the document.
pub struct PrestadorBlock;

impl PenedoBlock for PrestadorBlock {
    const NAME: &'static str = "PenedoPrestadorExtractor";

    fn schema() -> &'static RecordSchema {
        &PRESTADOR
    }

    fn find(text: &str, _trigger: &str, pattern: &Regex) -> Option<String> {
        capture(pattern, text)
    }
}

/// Party fields of a Penedo NFS-e.
pub struct PenedoParty<B> {
    doc: TextDocument,
    _block: PhantomData<fn() -> B>,
}

pub type PenedoTomador = PenedoParty<TomadorBlock>;
pub type PenedoPrestador = PenedoParty<PrestadorBlock>;

impl<B: PenedoBlock> PenedoParty<B> {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            doc: TextDocument::from_text(text),
            _block: PhantomData,
        }
    }

    fn find(&self, trigger: &str, pattern: &Regex) -> ExtractResult {
        Ok(B::find(text(&self.doc)?, trigger, pattern))
    }

    fn cpf(&self) -> ExtractResult {
        Ok(None)
    }

    fn cnpj(&self) -> ExtractResult {
        Ok(B::find_document(text(&self.doc)?))
    }

    fn inscricao_municipal(&self) -> ExtractResult {
        self.find("Inscrição Municipal", &INSCRICAO_MUNICIPAL)
    }

    fn razao_social(&self) -> ExtractResult {
        Ok(self
            .find("Nome/Razão Social", &RAZAO_SOCIAL)?
            .map(|s| s.trim().to_string()))
    }

    fn endereco(&self) -> ExtractResult {
        Ok(self.find("Endereço", &ENDERECO)?.map(|s| s.trim().to_string()))
    }

    fn municipio(&self) -> ExtractResult {
        Ok(self
            .find("Municipio", &MUNICIPIO)?
            .map(|s| title_case(s.trim())))
    }

    fn uf(&self) -> ExtractResult {
        self.find("UF", &UF)
    }

    fn cep(&self) -> ExtractResult {
        self.find("CEP", &CEP)
    }

    fn numero(&self) -> ExtractResult {
        Ok(None)
    }

    fn bairro(&self) -> ExtractResult {
        Ok(None)
    }

    fn telefone(&self) -> ExtractResult {
        self.find("TEL", &TELEFONE)
    }

    fn email(&self) -> ExtractResult {
        self.find("E-mail", &EMAIL)
    }
}

impl<B: PenedoBlock> FieldExtractor for PenedoParty<B> {
    const NAME: &'static str = B::NAME;

    fn schema() -> &'static RecordSchema {
        B::schema()
    }

    fn extension() -> FileExtension {
        FileExtension::Pdf
    }

    fn open(file: &SourceFile) -> Self {
        Self {
            doc: TextDocument::open(&file.path),
            _block: PhantomData,
        }
    }

    fn extract_methods() -> Vec<ExtractMethod<Self>> {
        extract_methods![
            cpf => Self::cpf,
            cnpj => Self::cnpj,
            inscricao_municipal => Self::inscricao_municipal,
            razao_social => Self::razao_social,
            endereco => Self::endereco,
            municipio => Self::municipio,
            uf => Self::uf,
            cep => Self::cep,
            numero => Self::numero,
            bairro => Self::bairro,
            telefone => Self::telefone,
            email => Self::email,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use crate::extract::FieldExtractorOperation;
    use crate::models::schema::FieldMap;
    use crate::pipeline::{Operation, Payload};
    use pretty_assertions::assert_eq;

    const LAYOUT: &str = "\
PREFEITURA MUNICIPAL DE PENEDO
Nota Fiscal de Serviços Eletrônica
Competência: MAR/2024
Número da Nota:
000012345
Data e Hora Emissão
Código de Verificação: AB12-CD34
15/03/2024 10:20:30
PRESTADOR DE SERVIÇOS
Nome/Razão Social: JLG TELECOM LTDA
CPF/CNPJ: 12.345.678/0001-90 Inscrição Municipal: 4455
Endereço: RUA DO COMERCIO, 100
Municipio: PENEDO UF: AL CEP: 57200000
TEL: 82999990000 E-mail: contato@jlg.com.br
TOMADOR DE SERVIÇOS
Nome/Razão Social: MUNICIPIO DE PENEDO
CPF/CNPJ: 98.765.432/0001-10 Inscrição Municipal: 7788
Endereço: PRACA BARAO DE PENEDO, 1
Municipio: SAO MIGUEL DOS CAMPOS UF: AL CEP: 57240000
TEL: 8233330000 E-mail: compras@penedo.al.gov.br
Município de Incidência do ISS:
PENEDO - AL
Código CNAE: 6190699
Serviços de telecomunicações
6190699 - outras atividades
DISCRIMINAÇÃO DOS SERVIÇOS
  Instalação de 20 câmeras
VALOR TOTAL DA NOTA = R$ 1.000,00
Valor Liquido (R$) Valor Deduções (R$)
950,00 0,00
PIS (R$)
0,00 0,00 6,50
COFINS (R$)
30,00
INSS (R$)
0,00 11,00
IRRF (R$)
0,00 0,00 0,00 0,00 15,00
CSLL (R$)
0,00 0,00 0,00 10,00
Base de Cálculo (R$)
0,00 0,00 1.000,00
Alíquota (%)
0,00 0,00 0,00 5,00
Valor do ISS
1.000,00 5,00 0,00 0,00 50,00
Outras Retenções(R$) 0,00
ISS Retido: NÃO
Não optante pelo Simples Nacional
";

    fn extract<E: FieldExtractor>(doc: &E) -> FieldMap {
        FieldExtractorOperation::<E>::new()
            .unwrap()
            .get_all_extracted_info(doc)
            .unwrap()
    }

    #[test]
    fn test_nota_fields() {
        let fields = extract(&PenedoNota::from_text(LAYOUT));

        let expected = [
            ("numero_nfs", Some("000012345")),
            ("codigo_autenticidade", Some("AB12-CD34")),
            ("data_competencia", Some("MAR/2024")),
            ("valor_liquido", Some("950,00")),
            ("valor_total", Some("1.000,00")),
            ("valor_deducoes", Some("0,00")),
            ("valor_pis", Some("6,50")),
            ("valor_cofins", Some("30,00")),
            ("valor_inss", Some("11,00")),
            ("valor_irrf", Some("15,00")),
            ("valor_csll", Some("10,00")),
            ("valor_issqn", Some("50,00")),
            ("base_calculo", Some("1.000,00")),
            ("aliquota", Some("5,00")),
            ("issqn_a_reter", Some("0")),
            ("estado", Some("AL")),
            ("codigo_tributacao", Some("6190699")),
            ("discriminacao_servico", Some("Instalação de 20 câmeras")),
            ("opt_simples_nacional", Some("0")),
            ("serie", None),
            ("nfse_substituida", None),
            ("valor_outras_retencoes", Some("0,00")),
            ("data_emissao", Some("15/03/2024 10:20:30")),
            ("atv_economica", Some("6190699")),
            ("municipio", Some("Penedo")),
        ];
        assert_eq!(fields.iter().collect::<Vec<_>>(), expected.to_vec());

        let op = FieldExtractorOperation::<PenedoNota>::new().unwrap();
        let record = op.validate_output(fields).unwrap();
        assert_eq!(record.kind(), "nota");
    }

    #[test]
    fn test_issqn_retido_sim() {
        let doc = PenedoNota::from_text("ISS Retido: Sim\nOptante pelo Simples Nacional");
        assert_eq!(doc.issqn_a_reter().unwrap(), Some("1".to_string()));
        assert_eq!(doc.opt_simples_nacional().unwrap(), Some("1".to_string()));
        assert_eq!(doc.valor_liquido().unwrap(), None);
    }

    #[test]
    fn test_label_on_last_line_has_no_value() {
        let doc = PenedoNota::from_text("PIS (R$)");
        assert_eq!(doc.valor_pis().unwrap(), None);
        assert_eq!(doc.data_emissao().unwrap(), None);
    }

    #[test]
    fn test_tomador_reads_its_own_block() {
        let fields = extract(&PenedoTomador::from_text(LAYOUT));

        assert_eq!(fields.value("cnpj"), Some("98.765.432/0001-10"));
        assert_eq!(fields.value("cpf"), None);
        assert_eq!(fields.value("inscricao_municipal"), Some("7788"));
        assert_eq!(fields.value("razao_social"), Some("MUNICIPIO DE PENEDO"));
        assert_eq!(fields.value("endereco"), Some("PRACA BARAO DE PENEDO, 1"));
        assert_eq!(fields.value("municipio"), Some("Sao Miguel Dos Campos"));
        assert_eq!(fields.value("uf"), Some("AL"));
        assert_eq!(fields.value("cep"), Some("57240000"));
        assert_eq!(fields.value("telefone"), Some("8233330000"));
        assert_eq!(fields.value("email"), Some("compras@penedo.al.gov.br"));
    }

    #[test]
    fn test_prestador_reads_first_block() {
        let fields = extract(&PenedoPrestador::from_text(LAYOUT));

        assert_eq!(fields.value("cnpj"), Some("12.345.678/0001-90"));
        assert_eq!(fields.value("razao_social"), Some("JLG TELECOM LTDA"));
        assert_eq!(fields.value("municipio"), Some("Penedo"));
        assert_eq!(fields.value("cep"), Some("57200000"));

        let op = FieldExtractorOperation::<PenedoPrestador>::new().unwrap();
        assert!(op.validate_output(fields).is_ok());
    }

    #[test]
    fn test_unreadable_pdf_fails_every_method() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let op = FieldExtractorOperation::<PenedoTomador>::new().unwrap();

        let err = op
            .run(Payload::File(SourceFile::new(&path, FileExtension::Pdf)))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("error running operation PenedoTomadorExtractor"));
        assert!(message.contains("extract_cnpj"));
        assert!(message.contains("file not found"));

        let doc = PenedoTomador::open(&SourceFile::new(&path, FileExtension::Pdf));
        assert!(matches!(
            doc.cep(),
            Err(ExtractFailure::Reader(ReaderError::NotFound(_)))
        ));
    }
}
