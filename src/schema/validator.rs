//! インスタンス文書の検証

use roxmltree::{Document, Node};
use std::collections::BTreeSet;

use super::datatypes::check_simple_value;
use super::model::{
    AttributeDecl, ComplexType, Content, ElementDecl, Particle, QName, ResolvedType, Schema, Term,
    TypeRef, XSI_NAMESPACE,
};
use super::Diagnostic;

/// 文書全体を検証し、診断を文書順に返す
pub(crate) fn validate_document(schema: &Schema, xml: &str) -> Vec<Diagnostic> {
    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            return vec![Diagnostic {
                line: e.pos().row,
                column: e.pos().col,
                message: format!("Failed to parse the XML resource 'document': {}", e),
            }]
        }
    };

    let mut validator = Validator {
        schema,
        doc: &doc,
        diagnostics: Vec::new(),
    };

    let root = doc.root_element();
    match schema.elements.get(&element_qname(&root)) {
        Some(decl) => validator.element(&root, &decl.type_ref),
        None => validator.report(
            &root,
            format!(
                "Element '{}': No matching global declaration available for the validation root.",
                element_qname(&root)
            ),
        ),
    }

    validator.diagnostics
}

fn element_qname(node: &Node<'_, '_>) -> QName {
    QName::new(node.tag_name().namespace(), node.tag_name().name())
}

fn text_content(node: &Node<'_, '_>) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}

struct Validator<'s, 'd, 'input> {
    schema: &'s Schema,
    doc: &'d Document<'input>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s, 'd, 'input> Validator<'s, 'd, 'input> {
    fn report(&mut self, node: &Node<'_, '_>, message: String) {
        let pos = self.doc.text_pos_at(node.range().start);
        self.diagnostics.push(Diagnostic {
            line: pos.row,
            column: pos.col,
            message,
        });
    }

    fn element(&mut self, node: &Node<'_, '_>, type_ref: &'s TypeRef) {
        match self.schema.resolve(type_ref) {
            ResolvedType::Any => {}
            ResolvedType::Builtin(_) | ResolvedType::Simple(_) => {
                self.simple_element(node, type_ref)
            }
            ResolvedType::Complex(complex) => self.complex_element(node, complex),
        }
    }

    fn simple_element(&mut self, node: &Node<'_, '_>, type_ref: &'s TypeRef) {
        let name = element_qname(node);
        self.attributes(node, &[], false);

        if node.children().any(|c| c.is_element()) {
            self.report(
                node,
                format!(
                    "Element '{}': Element content is not allowed, because the type definition is simple.",
                    name
                ),
            );
            return;
        }
        if let Err(message) = check_simple_value(self.schema, type_ref, &text_content(node)) {
            self.report(node, format!("Element '{}': {}", name, message));
        }
    }

    fn complex_element(&mut self, node: &Node<'_, '_>, complex: &'s ComplexType) {
        let name = element_qname(node);
        self.attributes(node, &complex.attributes, complex.any_attribute);

        let has_elements = node.children().any(|c| c.is_element());
        let has_text = !text_content(node).trim().is_empty();

        match &complex.content {
            Content::Empty => {
                if has_elements {
                    self.report(
                        node,
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is empty.",
                            name
                        ),
                    );
                } else if has_text && !complex.mixed {
                    self.report(
                        node,
                        format!(
                            "Element '{}': Character content is not allowed, because the content type is empty.",
                            name
                        ),
                    );
                }
            }
            Content::Simple(base) => {
                if has_elements {
                    self.report(
                        node,
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is a simple type definition.",
                            name
                        ),
                    );
                } else if let Err(message) =
                    check_simple_value(self.schema, base, &text_content(node))
                {
                    self.report(node, format!("Element '{}': {}", name, message));
                }
            }
            Content::Elements(particle) => {
                if has_text && !complex.mixed {
                    self.report(
                        node,
                        format!(
                            "Element '{}': Character content other than whitespace is not allowed because the content type is 'element-only'.",
                            name
                        ),
                    );
                }
                self.children(node, particle);
            }
        }
    }

    fn attributes(&mut self, node: &Node<'_, '_>, decls: &'s [AttributeDecl], any_attribute: bool) {
        let name = element_qname(node);

        for attribute in node.attributes() {
            if attribute.namespace() == Some(XSI_NAMESPACE) {
                continue;
            }
            let attribute_name = QName::new(attribute.namespace(), attribute.name());
            match decls.iter().find(|d| d.name == attribute_name) {
                Some(decl) => {
                    if let Err(message) =
                        check_simple_value(self.schema, &decl.type_ref, attribute.value())
                    {
                        self.report(
                            node,
                            format!("Element '{}', attribute '{}': {}", name, attribute_name, message),
                        );
                    }
                }
                None if !any_attribute => self.report(
                    node,
                    format!(
                        "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                        name, attribute_name, attribute_name
                    ),
                ),
                None => {}
            }
        }

        for decl in decls.iter().filter(|d| d.required) {
            let present = node
                .attributes()
                .any(|a| QName::new(a.namespace(), a.name()) == decl.name);
            if !present {
                self.report(
                    node,
                    format!(
                        "Element '{}': The attribute '{}' is required but missing.",
                        name, decl.name
                    ),
                );
            }
        }
    }

    /// 子要素の並びを内容モデルと照合し、照合できた子要素を再帰的に検証
    fn children(&mut self, node: &Node<'_, '_>, particle: &'s Particle) {
        let child_nodes: Vec<Node<'_, '_>> = node.children().filter(|c| c.is_element()).collect();
        let names: Vec<QName> = child_nodes.iter().map(element_qname).collect();

        let mut matcher = ContentMatcher::new(self.schema, &names);
        let accepted = matcher.run(particle);

        let checked = if accepted {
            names.len()
        } else {
            matcher.furthest.min(names.len())
        };
        for (child, assigned) in child_nodes.iter().zip(matcher.assigned.iter().copied()).take(checked) {
            if let Some(decl) = assigned {
                self.element(child, &decl.type_ref);
            }
        }

        if accepted {
            return;
        }

        let expected = expected_suffix(&matcher.expected);
        match child_nodes.get(matcher.furthest) {
            Some(unexpected) => self.report(
                unexpected,
                format!(
                    "Element '{}': This element is not expected.{}",
                    element_qname(unexpected),
                    expected
                ),
            ),
            None => self.report(
                node,
                format!(
                    "Element '{}': Missing child element(s).{}",
                    element_qname(node),
                    expected
                ),
            ),
        }
    }
}

fn expected_suffix(expected: &[String]) -> String {
    match expected.len() {
        0 => String::new(),
        1 => format!(" Expected is ( {} ).", expected[0]),
        _ => format!(" Expected is one of ( {} ).", expected.join(", ")),
    }
}

/// 内容モデルの照合器
///
/// 子要素列の位置の集合を状態として、粒子ごとに到達可能な位置を求めます。
/// 失敗時は最も先まで進んだ位置と、そこで期待されていた要素名を保持します。
struct ContentMatcher<'s, 'n> {
    schema: &'s Schema,
    names: &'n [QName],
    /// 子要素ごとに照合された宣言（`xs:any`で照合された場合は`None`）
    assigned: Vec<Option<&'s ElementDecl>>,
    furthest: usize,
    expected: Vec<String>,
}

type Positions = BTreeSet<usize>;

/// `xs:all`で扱える粒子の上限
const MAX_ALL_MEMBERS: usize = 64;

impl<'s, 'n> ContentMatcher<'s, 'n> {
    fn new(schema: &'s Schema, names: &'n [QName]) -> Self {
        Self {
            schema,
            names,
            assigned: vec![None; names.len()],
            furthest: 0,
            expected: Vec::new(),
        }
    }

    /// すべての子要素を消費できれば`true`
    fn run(&mut self, particle: &'s Particle) -> bool {
        let start = Positions::from([0]);
        self.particle(particle, &start).contains(&self.names.len())
    }

    fn reach(&mut self, position: usize) {
        if position > self.furthest {
            self.furthest = position;
            self.expected.clear();
        }
    }

    fn expect(&mut self, position: usize, name: String) {
        self.reach(position);
        if position == self.furthest && !self.expected.contains(&name) {
            self.expected.push(name);
        }
    }

    fn particle(&mut self, particle: &'s Particle, starts: &Positions) -> Positions {
        let mut result = Positions::new();
        if particle.min_occurs == 0 {
            result.extend(starts.iter().copied());
        }

        let mut current = starts.clone();
        let mut count: u32 = 0;
        loop {
            if particle.max_occurs.map_or(false, |max| count >= max) {
                break;
            }
            let next = self.term(&particle.term, &current);
            count += 1;
            if next.is_empty() {
                break;
            }

            let progressed = next != current;
            if count >= particle.min_occurs || !progressed {
                result.extend(next.iter().copied());
            }
            // 空にマッチする項は繰り返しても位置が変わらない
            if !progressed || count as usize > self.names.len() + 1 {
                break;
            }
            current = next;
        }
        result
    }

    fn term(&mut self, term: &'s Term, starts: &Positions) -> Positions {
        match term {
            Term::Element(decl) => self.element(decl, starts),
            Term::Ref(name) => match self.schema.elements.get(name) {
                Some(decl) => self.element(decl, starts),
                None => Positions::new(),
            },
            Term::Sequence(items) => {
                let mut current = starts.clone();
                for item in items {
                    current = self.particle(item, &current);
                    if current.is_empty() {
                        break;
                    }
                }
                current
            }
            Term::Choice(items) => {
                let mut result = Positions::new();
                for item in items {
                    result.extend(self.particle(item, starts));
                }
                result
            }
            Term::All(items) => self.all(items, starts),
            Term::Any => {
                let mut result = Positions::new();
                for &start in starts {
                    if start < self.names.len() {
                        self.reach(start + 1);
                        result.insert(start + 1);
                    }
                }
                result
            }
        }
    }

    fn element(&mut self, decl: &'s ElementDecl, starts: &Positions) -> Positions {
        let mut result = Positions::new();
        for &start in starts {
            if self.names.get(start) == Some(&decl.name) {
                if self.assigned[start].is_none() {
                    self.assigned[start] = Some(decl);
                }
                self.reach(start + 1);
                result.insert(start + 1);
            } else {
                self.expect(start, decl.name.to_string());
            }
        }
        result
    }

    /// `xs:all`: 各粒子を高々1回、任意の順序で
    fn all(&mut self, items: &'s [Particle], starts: &Positions) -> Positions {
        let items = &items[..items.len().min(MAX_ALL_MEMBERS)];
        let required: u64 = items
            .iter()
            .enumerate()
            .filter(|(_, p)| p.min_occurs > 0)
            .fold(0, |mask, (i, _)| mask | (1 << i));

        let mut seen: BTreeSet<(usize, u64)> = starts.iter().map(|&s| (s, 0)).collect();
        let mut pending: Vec<(usize, u64)> = seen.iter().copied().collect();
        let mut result = Positions::new();

        while let Some((position, used)) = pending.pop() {
            if used & required == required {
                result.insert(position);
            }
            for (i, item) in items.iter().enumerate() {
                if used & (1 << i) != 0 {
                    continue;
                }
                let single = Positions::from([position]);
                for next in self.term(&item.term, &single) {
                    if next > position && seen.insert((next, used | (1 << i))) {
                        pending.push((next, used | (1 << i)));
                    }
                }
            }
        }
        result
    }
}
