//! Legacy decorators
//!
//! Class, member and parameter decorators of class declarations are
//! collected here; the emitter declares the class undecorated and applies
//! them with `__decorate` calls after the class body.

use crate::scan::{Span, TokenKind};

use super::bindings::{Scope, MEMBER_MODIFIERS};

pub const DECORATE_HELPER: &str = r#"var __decorate = (this && this.__decorate) || function (decorators, target, key, desc) {
    var c = arguments.length, r = c < 3 ? target : desc === null ? desc = Object.getOwnPropertyDescriptor(target, key) : desc, d;
    if (typeof Reflect === "object" && typeof Reflect.decorate === "function") r = Reflect.decorate(decorators, target, key, desc);
    else for (var i = decorators.length - 1; i >= 0; i--) if (d = decorators[i]) r = (c < 3 ? d(r) : c > 3 ? d(target, key, r) : d(target, key)) || r;
    return c > 3 && r && Object.defineProperty(target, key, r), r;
};
"#;

pub const PARAM_HELPER: &str = r#"var __param = (this && this.__param) || function (paramIndex, decorator) {
    return function (target, key) { decorator(target, key, paramIndex); }
};
"#;

/// Runtime helpers called by emitted modules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Helpers {
    pub decorate: bool,
    pub param: bool,
}

impl Helpers {
    pub fn merge(&mut self, other: Helpers) {
        self.decorate |= other.decorate;
        self.param |= other.param;
    }

    /// Helper definitions to place ahead of the modules
    pub fn text(&self) -> String {
        let mut out = String::new();
        if self.decorate {
            out.push_str(DECORATE_HELPER);
        }
        if self.param {
            out.push_str(PARAM_HELPER);
        }
        out
    }
}

/// One `@expression`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decorator {
    /// `@` through the end of the expression
    pub span: Span,
    pub expression: Span,
    pub type_arguments: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecorators {
    pub index: usize,
    pub decorators: Vec<Decorator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedMember {
    /// Property key as a script literal
    pub key: String,
    pub is_static: bool,
    /// Methods and accessors are decorated through their descriptor
    pub has_descriptor: bool,
    pub decorators: Vec<Decorator>,
    pub params: Vec<ParamDecorators>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedClass {
    pub name: Option<String>,
    /// Token index of the `class` keyword
    pub keyword: usize,
    /// Token index one past the class declaration
    pub end: usize,
    pub decorators: Vec<Decorator>,
    pub constructor_params: Vec<ParamDecorators>,
    pub members: Vec<DecoratedMember>,
}

impl DecoratedClass {
    /// The class binding takes the result of `__decorate`
    pub fn rebinds(&self) -> bool {
        !self.decorators.is_empty() || !self.constructor_params.is_empty()
    }

    pub fn has_params(&self) -> bool {
        !self.constructor_params.is_empty() || self.members.iter().any(|m| !m.params.is_empty())
    }

    fn all(&self) -> impl Iterator<Item = &Decorator> {
        self.decorators
            .iter()
            .chain(flatten(&self.constructor_params))
            .chain(self.members.iter().flat_map(|m| m.decorators.iter().chain(flatten(&m.params))))
    }
}

fn flatten(params: &[ParamDecorators]) -> impl Iterator<Item = &Decorator> {
    params.iter().flat_map(|p| p.decorators.iter())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoratorScan {
    pub classes: Vec<DecoratedClass>,
    /// Decorators on anything but a class declaration or its members
    pub misplaced: Vec<Decorator>,
}

impl DecoratorScan {
    /// Every decorator in source order
    pub fn all(&self) -> Vec<Decorator> {
        let mut all: Vec<Decorator> = self
            .classes
            .iter()
            .flat_map(|c| c.all().copied())
            .chain(self.misplaced.iter().copied())
            .collect();
        all.sort_by_key(|d| d.span.start);
        all
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.misplaced.is_empty()
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Decorator starting at `at` and the index after it
fn decorator_at(scope: &Scope, at: usize) -> Option<(Decorator, usize)> {
    if !scope.is(at, "@") || !(scope.is_ident(at + 1) || scope.is(at + 1, "(")) {
        return None;
    }
    let next = scope.skip_decorator(at);
    let type_arguments = (at + 1..next)
        .find(|&k| scope.is(k, "<") && scope.depth[k] == scope.depth[at])
        .and_then(|open| scope.angle_close(open).map(|close| scope.span(open, close)));
    let decorator = Decorator {
        span: scope.span(at, next - 1),
        expression: scope.span(at + 1, next - 1),
        type_arguments,
    };
    Some((decorator, next))
}

fn chain(scope: &Scope, mut at: usize, taken: &mut [bool]) -> (Vec<Decorator>, usize) {
    let mut decorators = Vec::new();
    while let Some((decorator, next)) = decorator_at(scope, at) {
        taken[at] = true;
        decorators.push(decorator);
        at = next;
    }
    (decorators, at)
}

/// A class declaration, not a class expression, starts at `keyword`
fn is_declaration(scope: &Scope, keyword: usize) -> bool {
    if keyword == 0 {
        return true;
    }
    let prev = keyword - 1;
    matches!(scope.text(prev), ";" | "}" | "{" | "export" | "default" | "abstract" | "declare")
        || (scope.tokens[keyword].newline_before && !scope.continues(prev, keyword))
}

fn params(scope: &Scope, open: usize, taken: &mut [bool]) -> Vec<ParamDecorators> {
    let close = scope.close_of(open);
    let inner = scope.depth[open] + 1;
    let mut out = Vec::new();
    let mut index = 0;
    let mut k = open + 1;
    while k < close {
        let (decorators, next) = chain(scope, k, taken);
        if !decorators.is_empty() {
            out.push(ParamDecorators { index, decorators });
        }
        k = next;
        while k < close && !(scope.is(k, ",") && scope.depth[k] == inner) {
            k += 1;
        }
        k += 1;
        index += 1;
    }
    out
}

fn members(scope: &Scope, open: usize, class: &mut DecoratedClass, taken: &mut [bool]) {
    let close = scope.close_of(open);
    let mut m = open + 1;
    while m < close {
        if scope.is(m, ";") {
            m += 1;
            continue;
        }
        let start = m;
        let (decorators, mut k) = chain(scope, m, taken);
        let mut is_static = false;
        while scope.is_ident(k) && MEMBER_MODIFIERS.contains(&scope.text(k)) && scope.member_follows(k + 1) {
            is_static |= scope.is(k, "static");
            k += 1;
        }
        if scope.is(k, "{") {
            // static block
            undo(&decorators, scope, taken);
            m = scope.close_of(k) + 1;
            continue;
        }
        if scope.is(k, "*") {
            k += 1;
        }
        let name = k;
        let key = match scope.kind(name) {
            Some(TokenKind::Ident) => Some(quote(scope.text(name))),
            Some(TokenKind::String) => Some(scope.text(name).to_string()),
            Some(TokenKind::Number) => Some(quote(scope.text(name))),
            _ => None,
        };
        k = match scope.text(name) {
            "[" => scope.close_of(name) + 1,
            "#" => name + 2,
            _ => name + 1,
        };
        if matches!(scope.text(k), "?" | "!") {
            k += 1;
        }
        if scope.is(k, "<") {
            if let Some(angle) = scope.angle_close(k) {
                k = angle + 1;
            }
        }
        let (param_decorators, has_descriptor, end) = if scope.is(k, "(") {
            let found = params(scope, k, taken);
            let mut body = scope.close_of(k) + 1;
            if scope.is(body, ":") {
                body = scope.skip_type(body + 1, false);
            }
            let end = if scope.is(body, "{") {
                scope.close_of(body) + 1
            } else {
                scope.member_end(body, close)
            };
            (found, true, end)
        } else {
            (Vec::new(), false, scope.member_end(k, close))
        };
        if scope.is(name, "constructor") && has_descriptor {
            undo(&decorators, scope, taken);
            class.constructor_params = param_decorators;
        } else if !decorators.is_empty() || !param_decorators.is_empty() {
            match key {
                Some(key) => class.members.push(DecoratedMember {
                    key,
                    is_static,
                    has_descriptor,
                    decorators,
                    params: param_decorators,
                }),
                None => {
                    undo(&decorators, scope, taken);
                    for p in &param_decorators {
                        undo(&p.decorators, scope, taken);
                    }
                }
            }
        }
        m = end.max(start + 1);
    }
}

fn undo(decorators: &[Decorator], scope: &Scope, taken: &mut [bool]) {
    for decorator in decorators {
        let at = scope.tokens.partition_point(|t| t.start < decorator.span.start);
        if let Some(flag) = taken.get_mut(at) {
            *flag = false;
        }
    }
}

/// Decorators of `scope`, grouped by the class declaration they apply to
pub fn scan_decorators(scope: &Scope) -> DecoratorScan {
    let mut scan = DecoratorScan::default();
    if !scope.tokens.iter().any(|t| t.kind == TokenKind::Punct && t.text(scope.source) == "@") {
        return scan;
    }
    let mut taken = vec![false; scope.len()];
    for keyword in 0..scope.len() {
        if !scope.is(keyword, "class") || !scope.is_ident(keyword) || (keyword > 0 && scope.is(keyword - 1, ".")) {
            continue;
        }
        // decorators written ahead of `export`, `default` and `abstract`
        let mut head = keyword;
        while head > 0 && matches!(scope.text(head - 1), "export" | "default" | "abstract") {
            head -= 1;
        }
        let leading = leading_chain(scope, head);
        if !is_declaration(scope, leading.unwrap_or(keyword)) {
            continue;
        }
        let Some(open) = scope.class_body(keyword) else {
            continue;
        };
        let name = (scope.is_ident(keyword + 1) && !matches!(scope.text(keyword + 1), "extends" | "implements"))
            .then(|| scope.text(keyword + 1).to_string());
        let mut class = DecoratedClass {
            name,
            keyword,
            end: scope.block_end(keyword),
            decorators: Vec::new(),
            constructor_params: Vec::new(),
            members: Vec::new(),
        };
        if let Some(first) = leading {
            let (decorators, _) = chain(scope, first, &mut taken);
            class.decorators = decorators;
        }
        members(scope, open, &mut class, &mut taken);
        if !class.decorators.is_empty() || !class.members.is_empty() || !class.constructor_params.is_empty() {
            scan.classes.push(class);
        }
    }

    let mut k = 0;
    while k < scope.len() {
        match decorator_at(scope, k) {
            Some((decorator, next)) if !taken[k] => {
                scan.misplaced.push(decorator);
                k = next;
            }
            _ => k += 1,
        }
    }
    scan
}

/// First `@` of the decorator chain ending right before token `head`
fn leading_chain(scope: &Scope, head: usize) -> Option<usize> {
    let mut first = None;
    let mut k = head;
    'outer: while k > 0 {
        // candidates: every `@` that could start a decorator ending at k
        for at in (0..k).rev() {
            if scope.is(at, "@") {
                if let Some((_, next)) = decorator_at(scope, at) {
                    if next == k {
                        first = Some(at);
                        k = at;
                        continue 'outer;
                    }
                }
            }
            if scope.depth[at] < scope.depth[head] || scope.is(at, ";") {
                break;
            }
        }
        break;
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::tokenize;

    fn scan(source: &str) -> DecoratorScan {
        let tokens = tokenize(source);
        scan_decorators(&Scope::new(source, &tokens))
    }

    fn text<'a>(source: &'a str, span: Span) -> &'a str {
        &source[span.start..span.end]
    }

    #[test]
    fn test_class_member_and_parameter_decorators() {
        let source = "@Component({ tag: 'x' })\nexport class A {\n    @prop() name = '';\n    @log static run(@inject(Svc) svc: Svc) {}\n    constructor(@inject(Db) db: Db) {}\n}\n";
        let scan = scan(source);
        assert!(scan.misplaced.is_empty());
        assert_eq!(scan.classes.len(), 1);
        let class = &scan.classes[0];
        assert_eq!(class.name.as_deref(), Some("A"));
        assert_eq!(text(source, class.decorators[0].expression), "Component({ tag: 'x' })");
        assert!(class.rebinds());
        assert_eq!(class.constructor_params[0].index, 0);
        assert_eq!(class.members.len(), 2);
        assert_eq!(class.members[0].key, "\"name\"");
        assert!(!class.members[0].has_descriptor);
        assert_eq!(class.members[1].key, "\"run\"");
        assert!(class.members[1].is_static);
        assert!(class.members[1].has_descriptor);
        assert_eq!(text(source, class.members[1].params[0].decorators[0].expression), "inject(Svc)");
        assert_eq!(scan.all().len(), 5);
    }

    #[test]
    fn test_member_only_class_does_not_rebind() {
        let scan = scan("class A {\n    @log m() {}\n}\n");
        assert!(!scan.classes[0].rebinds());
        assert!(!scan.classes[0].has_params());
    }

    #[test]
    fn test_decorators_off_class_declarations_are_misplaced() {
        let source = "const C = @dec class {};\nclass B {\n    @log #secret() {}\n}\n@dec function f() {}\n";
        let scan = scan(source);
        let misplaced: Vec<&str> = scan.misplaced.iter().map(|d| text(source, d.span)).collect();
        assert_eq!(misplaced, vec!["@dec", "@log", "@dec"]);
        assert!(scan.classes.is_empty());
    }

    #[test]
    fn test_generic_decorator_arguments() {
        let source = "@Entity<User>()\nclass User {}\n";
        let scan = scan(source);
        let decorator = scan.classes[0].decorators[0];
        assert_eq!(text(source, decorator.expression), "Entity<User>()");
        assert_eq!(decorator.type_arguments.map(|s| text(source, s)), Some("<User>"));
    }

    #[test]
    fn test_helpers_text() {
        let mut helpers = Helpers::default();
        assert!(helpers.text().is_empty());
        helpers.merge(Helpers { decorate: true, param: true });
        let text = helpers.text();
        assert!(text.starts_with("var __decorate = "));
        assert!(text.contains("var __param = "));
    }
}
