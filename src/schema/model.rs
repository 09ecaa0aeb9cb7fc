//! コンパイル済みスキーマのモデル

use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// XML Schemaの名前空間
pub(crate) const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema Instanceの名前空間（`xsi:*`属性は検証対象外）
pub(crate) const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// 名前空間付きの名前
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            local: local.to_string(),
        }
    }
}

impl fmt::Display for QName {
    /// libxml2と同じ`{namespace}local`形式
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// 組み込みの単純型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    AnyUri,
    Decimal,
    Integer,
    NonNegativeInteger,
    PositiveInteger,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    Boolean,
    Float,
    Double,
    Date,
    DateTime,
    Time,
    GYear,
    GYearMonth,
}

/// 空白の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WhiteSpace {
    Preserve,
    Replace,
    Collapse,
}

/// 型への参照
#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    /// `xs:anyType`（内容を検証しない）
    AnyType,
    Builtin(Builtin),
    /// 名前付きのユーザー定義型（検証時に解決）
    Named(QName),
    Simple(Box<SimpleType>),
    Complex(Box<ComplexType>),
}

/// 制約ファセット
#[derive(Debug, Clone, Default)]
pub(crate) struct Facets {
    pub enumeration: Vec<String>,
    /// (元のパターン, コンパイル済み正規表現)
    pub patterns: Vec<(String, Regex)>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// (字句, 数値)
    pub min_inclusive: Option<(String, f64)>,
    pub max_inclusive: Option<(String, f64)>,
    pub min_exclusive: Option<(String, f64)>,
    pub max_exclusive: Option<(String, f64)>,
    pub total_digits: Option<usize>,
    pub fraction_digits: Option<usize>,
}

/// 単純型
#[derive(Debug, Clone)]
pub(crate) enum SimpleType {
    Restriction { base: TypeRef, facets: Facets },
    Union(Vec<TypeRef>),
    List(TypeRef),
}

/// 属性宣言
#[derive(Debug, Clone)]
pub(crate) struct AttributeDecl {
    pub name: QName,
    pub type_ref: TypeRef,
    pub required: bool,
}

/// 複合型
#[derive(Debug, Clone)]
pub(crate) struct ComplexType {
    pub content: Content,
    pub attributes: Vec<AttributeDecl>,
    /// `anyAttribute`があれば未宣言の属性も許可
    pub any_attribute: bool,
    pub mixed: bool,
}

/// 複合型の内容
#[derive(Debug, Clone)]
pub(crate) enum Content {
    Empty,
    Elements(Particle),
    /// `simpleContent`（基底の単純型＋属性）
    Simple(TypeRef),
}

/// 出現回数付きの粒子
#[derive(Debug, Clone)]
pub(crate) struct Particle {
    pub min_occurs: u32,
    /// `None`は`unbounded`
    pub max_occurs: Option<u32>,
    pub term: Term,
}

/// 粒子の項
#[derive(Debug, Clone)]
pub(crate) enum Term {
    Element(ElementDecl),
    /// グローバル要素への参照
    Ref(QName),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    All(Vec<Particle>),
    Any,
}

/// 要素宣言
#[derive(Debug, Clone)]
pub(crate) struct ElementDecl {
    pub name: QName,
    pub type_ref: TypeRef,
}

/// コンパイル済みスキーマ
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) elements: HashMap<QName, ElementDecl>,
    pub(crate) simple_types: HashMap<QName, SimpleType>,
    pub(crate) complex_types: HashMap<QName, ComplexType>,
}

impl Schema {
    /// ユーザー定義型を解決する
    pub(crate) fn resolve<'a>(&'a self, type_ref: &'a TypeRef) -> ResolvedType<'a> {
        match type_ref {
            TypeRef::AnyType => ResolvedType::Any,
            TypeRef::Builtin(b) => ResolvedType::Builtin(*b),
            TypeRef::Simple(s) => ResolvedType::Simple(s),
            TypeRef::Complex(c) => ResolvedType::Complex(c),
            TypeRef::Named(name) => {
                if let Some(s) = self.simple_types.get(name) {
                    ResolvedType::Simple(s)
                } else if let Some(c) = self.complex_types.get(name) {
                    ResolvedType::Complex(c)
                } else {
                    ResolvedType::Any
                }
            }
        }
    }
}

/// 解決済みの型
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResolvedType<'a> {
    Any,
    Builtin(Builtin),
    Simple(&'a SimpleType),
    Complex(&'a ComplexType),
}
