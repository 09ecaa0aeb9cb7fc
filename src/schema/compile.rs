//! XSD文書からスキーマモデルへのコンパイル

use regex::Regex;
use roxmltree::{Document, Node};

use super::model::{
    AttributeDecl, Builtin, ComplexType, Content, ElementDecl, Facets, Particle, QName, Schema,
    SimpleType, Term, TypeRef, XSD_NAMESPACE,
};
use super::Diagnostic;

type CompileResult<T> = Result<T, Diagnostic>;

/// XSDテキストをコンパイル
///
/// 対応外の構文や解決できない型参照はエラーとして報告します。
pub(crate) fn compile_schema(text: &str) -> CompileResult<Schema> {
    let doc = Document::parse(text).map_err(|e| Diagnostic {
        line: e.pos().row,
        column: e.pos().col,
        message: format!("Failed to parse the XML resource 'schema': {}", e),
    })?;

    let root = doc.root_element();
    if !is_xsd(&root, "schema") {
        return Err(diagnostic(
            &doc,
            &root,
            "The XML document is not a schema document.".to_string(),
        ));
    }

    let compiler = Compiler {
        doc: &doc,
        target_namespace: root.attribute("targetNamespace").map(str::to_string),
        qualified_elements: root.attribute("elementFormDefault") == Some("qualified"),
        qualified_attributes: root.attribute("attributeFormDefault") == Some("qualified"),
    };

    let mut schema = Schema::default();
    for child in xsd_children(&root) {
        match child.tag_name().name() {
            "annotation" => {}
            "element" => {
                let decl = compiler.element(&child, true)?;
                schema.elements.insert(decl.name.clone(), decl);
            }
            "complexType" => {
                let name = compiler.global_name(&child)?;
                schema.complex_types.insert(name, compiler.complex_type(&child)?);
            }
            "simpleType" => {
                let name = compiler.global_name(&child)?;
                schema.simple_types.insert(name, compiler.simple_type(&child)?);
            }
            other => return Err(compiler.unsupported(&child, other)),
        }
    }

    compiler.check_references(&schema)?;
    Ok(schema)
}

fn is_xsd(node: &Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NAMESPACE)
        && node.tag_name().name() == local
}

/// XSD名前空間の子要素
fn xsd_children<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().namespace() == Some(XSD_NAMESPACE))
}

fn diagnostic(doc: &Document<'_>, node: &Node<'_, '_>, message: String) -> Diagnostic {
    let pos = doc.text_pos_at(node.range().start);
    Diagnostic {
        line: pos.row,
        column: pos.col,
        message,
    }
}

struct Compiler<'a, 'input> {
    doc: &'a Document<'input>,
    target_namespace: Option<String>,
    qualified_elements: bool,
    qualified_attributes: bool,
}

impl<'a, 'input> Compiler<'a, 'input> {
    fn error(&self, node: &Node<'_, '_>, message: String) -> Diagnostic {
        diagnostic(self.doc, node, message)
    }

    fn unsupported(&self, node: &Node<'_, '_>, construct: &str) -> Diagnostic {
        self.error(
            node,
            format!("Schema construct 'xs:{}' is not supported.", construct),
        )
    }

    fn required_attribute<'n>(&self, node: &Node<'n, '_>, name: &str) -> CompileResult<&'n str> {
        node.attribute(name).ok_or_else(|| {
            self.error(
                node,
                format!(
                    "Element 'xs:{}': The attribute '{}' is required but missing.",
                    node.tag_name().name(),
                    name
                ),
            )
        })
    }

    fn global_name(&self, node: &Node<'_, 'input>) -> CompileResult<QName> {
        let local = self.required_attribute(node, "name")?;
        Ok(QName::new(self.target_namespace.as_deref(), local))
    }

    /// `prefix:local`形式の参照を名前空間付きの名前へ
    fn qname(&self, node: &Node<'_, '_>, value: &str) -> CompileResult<QName> {
        let value = value.trim();
        let (prefix, local) = match value.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, value),
        };
        let namespace = node.lookup_namespace_uri(prefix);
        if prefix.is_some() && namespace.is_none() {
            return Err(self.error(
                node,
                format!("The QName value '{}' has no corresponding namespace declaration in scope.", value),
            ));
        }
        Ok(QName::new(namespace, local))
    }

    fn type_reference(&self, node: &Node<'_, '_>, value: &str) -> CompileResult<TypeRef> {
        let name = self.qname(node, value)?;
        if name.namespace.as_deref() != Some(XSD_NAMESPACE) {
            return Ok(TypeRef::Named(name));
        }
        if name.local == "anyType" {
            return Ok(TypeRef::AnyType);
        }
        Builtin::from_name(&name.local)
            .map(TypeRef::Builtin)
            .ok_or_else(|| {
                self.error(
                    node,
                    format!("The built-in type 'xs:{}' is not supported.", name.local),
                )
            })
    }

    fn element(&self, node: &Node<'_, 'input>, global: bool) -> CompileResult<ElementDecl> {
        let local = self.required_attribute(node, "name")?;
        let qualified = match node.attribute("form") {
            Some(form) => form == "qualified",
            None => global || self.qualified_elements,
        };
        let namespace = if qualified {
            self.target_namespace.as_deref()
        } else {
            None
        };

        let type_ref = match node.attribute("type") {
            Some(value) => self.type_reference(node, value)?,
            None => self.anonymous_type(node)?.unwrap_or(TypeRef::AnyType),
        };

        Ok(ElementDecl {
            name: QName::new(namespace, local),
            type_ref,
        })
    }

    /// 子要素として書かれた無名の型定義
    fn anonymous_type(&self, node: &Node<'_, 'input>) -> CompileResult<Option<TypeRef>> {
        for child in xsd_children(node) {
            match child.tag_name().name() {
                "complexType" => {
                    return Ok(Some(TypeRef::Complex(Box::new(self.complex_type(&child)?))))
                }
                "simpleType" => {
                    return Ok(Some(TypeRef::Simple(Box::new(self.simple_type(&child)?))))
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn occurs(&self, node: &Node<'_, '_>) -> CompileResult<(u32, Option<u32>)> {
        let parse = |name: &str, value: &str| {
            value.trim().parse::<u32>().map_err(|_| {
                self.error(node, format!("The value '{}' of '{}' is not valid.", value, name))
            })
        };
        let min = match node.attribute("minOccurs") {
            Some(value) => parse("minOccurs", value)?,
            None => 1,
        };
        let max = match node.attribute("maxOccurs") {
            Some("unbounded") => None,
            Some(value) => Some(parse("maxOccurs", value)?),
            None => Some(1),
        };
        if max.map_or(false, |max| max < min) {
            return Err(self.error(node, "maxOccurs must not be less than minOccurs.".to_string()));
        }
        Ok((min, max))
    }

    fn particle(&self, node: &Node<'_, 'input>) -> CompileResult<Particle> {
        let (min_occurs, max_occurs) = self.occurs(node)?;
        let term = match node.tag_name().name() {
            "element" => match node.attribute("ref") {
                Some(reference) => Term::Ref(self.qname(node, reference)?),
                None => Term::Element(self.element(node, false)?),
            },
            "sequence" => Term::Sequence(self.group_members(node)?),
            "choice" => Term::Choice(self.group_members(node)?),
            "all" => Term::All(self.group_members(node)?),
            "any" => Term::Any,
            other => return Err(self.unsupported(node, other)),
        };
        Ok(Particle {
            min_occurs,
            max_occurs,
            term,
        })
    }

    fn group_members(&self, node: &Node<'_, 'input>) -> CompileResult<Vec<Particle>> {
        xsd_children(node)
            .filter(|c| c.tag_name().name() != "annotation")
            .map(|c| self.particle(&c))
            .collect()
    }

    fn complex_type(&self, node: &Node<'_, 'input>) -> CompileResult<ComplexType> {
        let mut complex = ComplexType {
            content: Content::Empty,
            attributes: Vec::new(),
            any_attribute: false,
            mixed: node.attribute("mixed") == Some("true"),
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => {}
                "sequence" | "choice" | "all" => {
                    complex.content = Content::Elements(self.particle(&child)?);
                }
                "attribute" => complex.attributes.push(self.attribute(&child)?),
                "anyAttribute" => complex.any_attribute = true,
                "simpleContent" => self.simple_content(&child, &mut complex)?,
                other => return Err(self.unsupported(&child, other)),
            }
        }
        Ok(complex)
    }

    /// `simpleContent`の`extension`／`restriction`
    fn simple_content(
        &self,
        node: &Node<'_, 'input>,
        complex: &mut ComplexType,
    ) -> CompileResult<()> {
        let derivation = xsd_children(node)
            .find(|c| matches!(c.tag_name().name(), "extension" | "restriction"))
            .ok_or_else(|| self.error(node, "simpleContent requires a derivation.".to_string()))?;

        let base = self.type_reference(&derivation, self.required_attribute(&derivation, "base")?)?;
        let mut facets = Facets::default();
        let mut patterns = Vec::new();

        for child in xsd_children(&derivation) {
            match child.tag_name().name() {
                "annotation" => {}
                "attribute" => complex.attributes.push(self.attribute(&child)?),
                "anyAttribute" => complex.any_attribute = true,
                facet => self.facet(&child, facet, &mut facets, &mut patterns)?,
            }
        }
        self.finish_patterns(&derivation, patterns, &mut facets)?;

        complex.content = if derivation.tag_name().name() == "restriction" {
            Content::Simple(TypeRef::Simple(Box::new(SimpleType::Restriction {
                base,
                facets,
            })))
        } else {
            Content::Simple(base)
        };
        Ok(())
    }

    fn attribute(&self, node: &Node<'_, 'input>) -> CompileResult<AttributeDecl> {
        if node.has_attribute("ref") {
            return Err(self.unsupported(node, "attribute ref"));
        }
        let local = self.required_attribute(node, "name")?;
        let qualified = match node.attribute("form") {
            Some(form) => form == "qualified",
            None => self.qualified_attributes,
        };
        let namespace = if qualified {
            self.target_namespace.as_deref()
        } else {
            None
        };

        let type_ref = match node.attribute("type") {
            Some(value) => self.type_reference(node, value)?,
            None => match xsd_children(node).find(|c| c.tag_name().name() == "simpleType") {
                Some(simple) => TypeRef::Simple(Box::new(self.simple_type(&simple)?)),
                None => TypeRef::Builtin(Builtin::AnySimpleType),
            },
        };

        Ok(AttributeDecl {
            name: QName::new(namespace, local),
            type_ref,
            required: node.attribute("use") == Some("required"),
        })
    }

    fn simple_type(&self, node: &Node<'_, 'input>) -> CompileResult<SimpleType> {
        let derivation = xsd_children(node)
            .find(|c| c.tag_name().name() != "annotation")
            .ok_or_else(|| self.error(node, "simpleType requires a derivation.".to_string()))?;

        match derivation.tag_name().name() {
            "restriction" => {
                let base = match derivation.attribute("base") {
                    Some(value) => self.type_reference(&derivation, value)?,
                    None => self.inline_simple_type(&derivation)?,
                };
                let mut facets = Facets::default();
                let mut patterns = Vec::new();
                for child in xsd_children(&derivation) {
                    match child.tag_name().name() {
                        "annotation" | "simpleType" => {}
                        facet => self.facet(&child, facet, &mut facets, &mut patterns)?,
                    }
                }
                self.finish_patterns(&derivation, patterns, &mut facets)?;
                Ok(SimpleType::Restriction { base, facets })
            }
            "union" => {
                let mut members = Vec::new();
                if let Some(member_types) = derivation.attribute("memberTypes") {
                    for name in member_types.split_whitespace() {
                        members.push(self.type_reference(&derivation, name)?);
                    }
                }
                for child in xsd_children(&derivation).filter(|c| c.tag_name().name() == "simpleType") {
                    members.push(TypeRef::Simple(Box::new(self.simple_type(&child)?)));
                }
                Ok(SimpleType::Union(members))
            }
            "list" => {
                let item = match derivation.attribute("itemType") {
                    Some(value) => self.type_reference(&derivation, value)?,
                    None => self.inline_simple_type(&derivation)?,
                };
                Ok(SimpleType::List(item))
            }
            other => Err(self.unsupported(&derivation, other)),
        }
    }

    fn inline_simple_type(&self, node: &Node<'_, 'input>) -> CompileResult<TypeRef> {
        let simple = xsd_children(node)
            .find(|c| c.tag_name().name() == "simpleType")
            .ok_or_else(|| self.error(node, "A base type is required.".to_string()))?;
        Ok(TypeRef::Simple(Box::new(self.simple_type(&simple)?)))
    }

    fn facet(
        &self,
        node: &Node<'_, '_>,
        facet: &str,
        facets: &mut Facets,
        patterns: &mut Vec<String>,
    ) -> CompileResult<()> {
        let value = self.required_attribute(node, "value")?;
        let count = || {
            value.trim().parse::<usize>().map_err(|_| {
                self.error(
                    node,
                    format!("The value '{}' of the facet '{}' is not valid.", value, facet),
                )
            })
        };
        let bound = || (value.to_string(), value.trim().parse::<f64>().unwrap_or(f64::NAN));

        match facet {
            "enumeration" => facets.enumeration.push(value.to_string()),
            "pattern" => patterns.push(value.to_string()),
            "length" => facets.length = Some(count()?),
            "minLength" => facets.min_length = Some(count()?),
            "maxLength" => facets.max_length = Some(count()?),
            "totalDigits" => facets.total_digits = Some(count()?),
            "fractionDigits" => facets.fraction_digits = Some(count()?),
            "minInclusive" => facets.min_inclusive = Some(bound()),
            "maxInclusive" => facets.max_inclusive = Some(bound()),
            "minExclusive" => facets.min_exclusive = Some(bound()),
            "maxExclusive" => facets.max_exclusive = Some(bound()),
            "whiteSpace" => {}
            other => return Err(self.unsupported(node, other)),
        }
        Ok(())
    }

    /// 同じ派生段階のパターンは論理和として1つにまとめる
    fn finish_patterns(
        &self,
        node: &Node<'_, '_>,
        patterns: Vec<String>,
        facets: &mut Facets,
    ) -> CompileResult<()> {
        if patterns.is_empty() {
            return Ok(());
        }
        let source = patterns.join("|");
        let anchored = format!(
            "^(?:{})$",
            patterns
                .iter()
                .map(|p| format!("(?:{})", p))
                .collect::<Vec<_>>()
                .join("|")
        );
        let regex = Regex::new(&anchored).map_err(|e| {
            self.error(
                node,
                format!("The pattern '{}' is not a valid regular expression: {}", source, e),
            )
        })?;
        facets.patterns.push((source, regex));
        Ok(())
    }

    /// 名前付きの型と要素参照がすべて解決できるか検査
    fn check_references(&self, schema: &Schema) -> CompileResult<()> {
        let mut unresolved = Vec::new();
        let visit_type = |type_ref: &TypeRef, unresolved: &mut Vec<String>| {
            if let TypeRef::Named(name) = type_ref {
                if !schema.simple_types.contains_key(name) && !schema.complex_types.contains_key(name)
                {
                    unresolved.push(format!("type '{}'", name));
                }
            }
        };

        let mut stack: Vec<&TypeRef> = Vec::new();
        let mut particles: Vec<&Particle> = Vec::new();

        stack.extend(schema.elements.values().map(|e| &e.type_ref));
        for simple in schema.simple_types.values() {
            push_simple_refs(simple, &mut stack);
        }
        for complex in schema.complex_types.values() {
            push_complex_refs(complex, &mut stack, &mut particles);
        }

        while !stack.is_empty() || !particles.is_empty() {
            while let Some(particle) = particles.pop() {
                match &particle.term {
                    Term::Element(decl) => stack.push(&decl.type_ref),
                    Term::Ref(name) => {
                        if !schema.elements.contains_key(name) {
                            unresolved.push(format!("element '{}'", name));
                        }
                    }
                    Term::Sequence(items) | Term::Choice(items) | Term::All(items) => {
                        particles.extend(items.iter())
                    }
                    Term::Any => {}
                }
            }
            while let Some(type_ref) = stack.pop() {
                visit_type(type_ref, &mut unresolved);
                match type_ref {
                    TypeRef::Simple(simple) => push_simple_refs(simple, &mut stack),
                    TypeRef::Complex(complex) => {
                        push_complex_refs(complex, &mut stack, &mut particles)
                    }
                    _ => {}
                }
            }
        }

        if unresolved.is_empty() {
            return Ok(());
        }
        unresolved.sort();
        unresolved.dedup();
        let root = self.doc.root_element();
        Err(self.error(
            &root,
            format!("The schema references undefined components: {}.", unresolved.join(", ")),
        ))
    }
}

fn push_simple_refs<'s>(simple: &'s SimpleType, stack: &mut Vec<&'s TypeRef>) {
    match simple {
        SimpleType::Restriction { base, .. } => stack.push(base),
        SimpleType::Union(members) => stack.extend(members.iter()),
        SimpleType::List(item) => stack.push(item),
    }
}

fn push_complex_refs<'s>(
    complex: &'s ComplexType,
    stack: &mut Vec<&'s TypeRef>,
    particles: &mut Vec<&'s Particle>,
) {
    stack.extend(complex.attributes.iter().map(|a| &a.type_ref));
    match &complex.content {
        Content::Empty => {}
        Content::Elements(particle) => particles.push(particle),
        Content::Simple(base) => stack.push(base),
    }
}
