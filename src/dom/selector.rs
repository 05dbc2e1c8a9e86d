//! 结构选择器
//! 支持 CSS 选择器的常用子集：类型、*、.class、#id、[attr]、[attr=value]、
//! :nth-child(n)、:first-child、:last-child，后代与子代（>）组合符，以及逗号分组。

use std::fmt;
use std::str::FromStr;

use super::document::{Document, NodeId};
use crate::error::{LocResult, LocalizerError};

/// 编译后的选择器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    groups: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    compounds: Vec<CompoundSelector>,
    // combinators[i] 连接 compounds[i] 与 compounds[i + 1]
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<PseudoClass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrSelector {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PseudoClass {
    NthChild(usize),
    FirstChild,
    LastChild,
}

impl Selector {
    /// 解析选择器字符串
    pub fn parse(raw: &str) -> LocResult<Self> {
        let mut parser = SelectorParser::new(raw);
        let groups = parser.parse_list()?;
        Ok(Self {
            raw: raw.trim().to_string(),
            groups,
        })
    }

    /// 原始选择器文本（同时作为缓存键的一部分）
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 元素是否匹配该选择器
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.is_element(id)
            && self
                .groups
                .iter()
                .any(|group| matches_complex(doc, id, group, group.compounds.len() - 1))
    }

    /// 按文档顺序返回 body 下所有匹配的元素
    pub fn select_all(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.body())
            .into_iter()
            .filter(|&id| self.matches(doc, id))
            .collect()
    }

    /// body 下第一个匹配的元素
    pub fn select_first(&self, doc: &Document) -> Option<NodeId> {
        doc.descendants(doc.body())
            .into_iter()
            .find(|&id| self.matches(doc, id))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Selector {
    type Err = LocalizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn matches_compound(doc: &Document, id: NodeId, compound: &CompoundSelector) -> bool {
    let Some(data) = doc.element(id) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if data.name != *tag {
            return false;
        }
    }
    if !compound.ids.iter().all(|expected| data.attr("id") == Some(expected.as_str())) {
        return false;
    }
    if !compound.classes.iter().all(|class| data.classes().any(|name| name == class)) {
        return false;
    }
    let attrs_ok = compound.attrs.iter().all(|attr| match attr {
        AttrSelector::Exists(name) => data.attr(name).is_some(),
        AttrSelector::Equals(name, value) => data.attr(name) == Some(value.as_str()),
    });
    if !attrs_ok {
        return false;
    }
    compound.pseudos.iter().all(|pseudo| {
        let position = doc.element_position(id);
        match pseudo {
            PseudoClass::NthChild(n) => position == Some(*n),
            PseudoClass::FirstChild => position == Some(1),
            PseudoClass::LastChild => {
                let Some(parent) = doc.parent(id) else {
                    return false;
                };
                let count = doc.children(parent).iter().filter(|&&c| doc.is_element(c)).count();
                position == Some(count)
            }
        }
    })
}

/// 从右向左匹配复合选择器
fn matches_complex(doc: &Document, id: NodeId, group: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(doc, id, &group.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match group.combinators[index - 1] {
        Combinator::Child => doc
            .parent_element(id)
            .map(|parent| matches_complex(doc, parent, group, index - 1))
            .unwrap_or(false),
        Combinator::Descendant => doc
            .ancestors(id)
            .filter(|&ancestor| doc.is_element(ancestor))
            .any(|ancestor| matches_complex(doc, ancestor, group, index - 1)),
    }
}

/// 选择器语法解析
struct SelectorParser<'a> {
    raw: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            chars: raw.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> LocalizerError {
        LocalizerError::SelectorError(format!("{}（选择器：{}，位置：{}）", message, self.raw, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, expected: char) -> LocResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("缺少 '{}'", expected))),
        }
    }

    /// 跳过空白，返回是否跳过了内容
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn parse_list(&mut self) -> LocResult<Vec<ComplexSelector>> {
        let mut groups = Vec::new();
        loop {
            self.skip_whitespace();
            groups.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(_) => return Err(self.error("无法识别的字符")),
            }
        }
        Ok(groups)
    }

    fn parse_complex(&mut self) -> LocResult<ComplexSelector> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_whitespace => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.error("无法识别的字符")),
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(ComplexSelector { compounds, combinators })
    }

    fn parse_compound(&mut self) -> LocResult<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        let mut parsed_any = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                parsed_any = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                parsed_any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.bump();
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
            parsed_any = true;
        }

        if !parsed_any {
            return Err(self.error("选择器为空"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> LocResult<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("缺少标识符"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attr(&mut self) -> LocResult<AttrSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(AttrSelector::Exists(name));
        }

        self.expect('=')?;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c != quote) {
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.expect(quote)?;
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        self.expect(']')?;
        Ok(AttrSelector::Equals(name, value))
    }

    fn parse_pseudo(&mut self) -> LocResult<PseudoClass> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "first-child" => Ok(PseudoClass::FirstChild),
            "last-child" => Ok(PseudoClass::LastChild),
            "nth-child" => {
                self.expect('(')?;
                self.skip_whitespace();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let n = digits
                    .parse::<usize>()
                    .map_err(|_| self.error("nth-child 仅支持正整数参数"))?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(PseudoClass::NthChild(n))
            }
            other => Err(self.error(&format!("不支持的伪类 :{}", other))),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
