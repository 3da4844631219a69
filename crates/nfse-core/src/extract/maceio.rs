//! Maceió NFS-e extractors (GISS ABRASF v2.04 XML).

use std::marker::PhantomData;

use lazy_static::lazy_static;

use super::{ExtractMethod, ExtractResult, FieldExtractor};
use crate::extract_methods;
use crate::models::business::{NOTA, PRESTADOR, TOMADOR};
use crate::models::file::{FileExtension, SourceFile};
use crate::models::schema::RecordSchema;
use crate::xml::{Namespaces, XmlDocument, XmlSource};

lazy_static! {
    static ref GISS: Namespaces = Namespaces::new()
        .with("ns2", "http://www.giss.com.br/tipos-v2_04.xsd")
        .with("ns3", "http://www.w3.org/2000/09/xmldsig#");
}

fn find(source: &XmlSource, path: &str) -> ExtractResult {
    Ok(source.find_text(path, &GISS)?)
}

/// Invoice fields of a Maceió NFS-e.
pub struct MaceioNota {
    source: XmlSource,
}

impl MaceioNota {
    pub fn from_document(document: XmlDocument) -> Self {
        Self {
            source: XmlSource::from_document(document),
        }
    }

    fn numero_nfs(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:Numero")
    }

    fn codigo_autenticidade(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:CodigoVerificacao")
    }

    fn data_competencia(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Competencia")
    }

    fn valor_liquido(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:ValoresNfse/ns2:ValorLiquidoNfse")
    }

    fn valor_total(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorServicos")
    }

    fn valor_deducoes(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorDeducoes")
    }

    fn valor_pis(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorPis")
    }

    fn valor_cofins(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorCofins")
    }

    fn valor_inss(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorInss")
    }

    fn valor_irrf(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorIr")
    }

    fn valor_csll(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:ValorCsll")
    }

    fn valor_issqn(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:ValoresNfse/ns2:ValorIss")
    }

    fn base_calculo(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:ValoresNfse/ns2:BaseCalculo")
    }

    fn aliquota(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:ValoresNfse/ns2:Aliquota")
    }

    fn issqn_a_reter(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:IssRetido")
    }

    fn estado(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:PrestadorServico/ns2:Endereco/ns2:Uf")
    }

    fn codigo_tributacao(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:CodigoTributacaoMunicipio")
    }

    fn discriminacao_servico(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Discriminacao")
    }

    fn opt_simples_nacional(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:OptanteSimplesNacional")
    }

    // GISS documents carry no series
    fn serie(&self) -> ExtractResult {
        Ok(None)
    }

    fn nfse_substituida(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:NfseSubstituida")
    }

    fn valor_outras_retencoes(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Servico/ns2:Valores/ns2:OutrasRetencoes")
    }

    fn data_emissao(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:DataEmissao")
    }

    fn atv_economica(&self) -> ExtractResult {
        find(&self.source, ".//ns2:ItemListaServico")
    }

    fn municipio(&self) -> ExtractResult {
        find(&self.source, ".//ns2:InfNfse/ns2:PrestadorServico/ns2:Endereco/ns2:CodigoMunicipio")
    }
}

impl FieldExtractor for MaceioNota {
    const NAME: &'static str = "MaceioNotaExtractor";

    fn schema() -> &'static RecordSchema {
        &NOTA
    }

    fn extension() -> FileExtension {
        FileExtension::Xml
    }

    fn open(file: &SourceFile) -> Self {
        Self {
            source: XmlSource::open(&file.path),
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

/// Where a party's data lives in the GISS document.
pub trait MaceioSection: 'static {
    const NAME: &'static str;

    fn schema() -> &'static RecordSchema;

    /// Element holding name, address and contact.
    const BASE: &'static str;

    /// Element holding the party's `CpfCnpj` and `InscricaoMunicipal`.
    const IDENTIFICATION: &'static str;
}

pub struct TomadorSection;

impl MaceioSection for TomadorSection {
    const NAME: &'static str = "MaceioTomadorExtractor";
    const BASE: &'static str = ".//ns2:TomadorServico";
    const IDENTIFICATION: &'static str = ".//ns2:TomadorServico/ns2:IdentificacaoTomador";

    fn schema() -> &'static RecordSchema {
        &TOMADOR
    }
}

pub struct PrestadorSection;

impl MaceioSection for PrestadorSection {
    const NAME: &'static str = "MaceioPrestadorExtractor";
    const BASE: &'static str = ".//ns2:PrestadorServico";
    const IDENTIFICATION: &'static str = ".//ns2:InfDeclaracaoPrestacaoServico/ns2:Prestador";

    fn schema() -> &'static RecordSchema {
        &PRESTADOR
    }
}

/// Party fields of a Maceió NFS-e.
pub struct MaceioParty<S> {
    source: XmlSource,
    _section: PhantomData<fn() -> S>,
}

pub type MaceioTomador = MaceioParty<TomadorSection>;
pub type MaceioPrestador = MaceioParty<PrestadorSection>;

impl<S: MaceioSection> MaceioParty<S> {
    pub fn from_document(document: XmlDocument) -> Self {
        Self {
            source: XmlSource::from_document(document),
            _section: PhantomData,
        }
    }

    fn base(&self, tail: &str) -> ExtractResult {
        find(&self.source, &format!("{}/{tail}", S::BASE))
    }

    fn identification(&self, tail: &str) -> ExtractResult {
        find(&self.source, &format!("{}/{tail}", S::IDENTIFICATION))
    }

    fn cpf(&self) -> ExtractResult {
        self.identification("ns2:CpfCnpj/ns2:Cpf")
    }

    fn cnpj(&self) -> ExtractResult {
        self.identification("ns2:CpfCnpj/ns2:Cnpj")
    }

    fn inscricao_municipal(&self) -> ExtractResult {
        self.identification("ns2:InscricaoMunicipal")
    }

    fn razao_social(&self) -> ExtractResult {
        self.base("ns2:RazaoSocial")
    }

    fn endereco(&self) -> ExtractResult {
        self.base("ns2:Endereco/ns2:Endereco")
    }

    /// IBGE municipality code.
    fn municipio(&self) -> ExtractResult {
        self.base("ns2:Endereco/ns2:CodigoMunicipio")
    }

    fn uf(&self) -> ExtractResult {
        self.base("ns2:Endereco/ns2:Uf")
    }

    fn cep(&self) -> ExtractResult {
        self.base("ns2:Endereco/ns2:Cep")
    }

    fn numero(&self) -> ExtractResult {
        self.base("ns2:Endereco/ns2:Numero")
    }

    fn bairro(&self) -> ExtractResult {
        self.base("ns2:Endereco/ns2:Bairro")
    }

    fn telefone(&self) -> ExtractResult {
        self.base("ns2:Contato/ns2:Telefone")
    }

    fn email(&self) -> ExtractResult {
        self.base("ns2:Contato/ns2:Email")
    }
}

impl<S: MaceioSection> FieldExtractor for MaceioParty<S> {
    const NAME: &'static str = S::NAME;

    fn schema() -> &'static RecordSchema {
        S::schema()
    }

    fn extension() -> FileExtension {
        FileExtension::Xml
    }

    fn open(file: &SourceFile) -> Self {
        Self {
            source: XmlSource::open(&file.path),
            _section: PhantomData,
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
