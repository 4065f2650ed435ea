use super::parse::{parse_expression, TokenStream};
use super::token::{Keyword, Token, TokenTag};
use super::Error;
use crate::mach::eval;
use crate::mach::val::Val;

type Result<T> = std::result::Result<T, Error>;

const REGION_MAX: usize = 16;
const PARAM_MAX: usize = 16;
const EXPAND_PASS_MAX: usize = 256;

struct MacroParam {
    default_param: Option<String>,
}

struct Macro {
    name: String,
    is_ctype: bool,
    replacing: String,
    params: Vec<MacroParam>,
}

struct Region {
    valid: bool,
    line: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Directive {
    Define,
    Undef,
    If,
    Ifdef,
    Endif,
    Enum,
}

impl Directive {
    fn from_name(s: &str) -> Option<Directive> {
        use Directive::*;
        static TABLE: &[(Directive, &str)] = &[
            (Define, "define"),
            (Undef, "undef"),
            (If, "if"),
            (Ifdef, "ifdef"),
            (Endif, "endif"),
            (Enum, "enum"),
        ];
        TABLE
            .iter()
            .find(|(_, word)| word.eq_ignore_ascii_case(s))
            .map(|(directive, _)| *directive)
    }
}

/// Runs the textual preprocessor over a whole script. The output keeps
/// one newline per consumed source newline, so token positions reported
/// downstream still point at the right line.
pub fn preprocess(src: &str) -> Result<String> {
    Prepro::new().run(src)
}

/// Line-oriented macro expander with `#if`/`#ifdef` region tracking and
/// an `#enum` counter.
struct Prepro {
    macros: Vec<Macro>,
    regions: Vec<Region>,
    enum_next: i32,
    line: usize,
}

impl Prepro {
    fn new() -> Prepro {
        let mut prepro = Prepro {
            macros: vec![],
            regions: vec![],
            enum_next: 0,
            line: 0,
        };
        prepro.macros.push(Macro {
            name: "M_PI".into(),
            is_ctype: false,
            replacing: "3.141592653589793238".into(),
            params: vec![],
        });
        prepro
    }

    fn is_valid(&self) -> bool {
        self.regions.last().map_or(true, |region| region.valid)
    }

    fn find_macro(&self, name: &str) -> Option<usize> {
        self.macros
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
    }

    fn register_macro(&mut self, macro_: Macro) -> Result<()> {
        if self.find_macro(&macro_.name).is_some() {
            return Err(error!(PreproError, self.line;
                format!("macro redefined ({})", macro_.name)));
        }
        self.macros.push(macro_);
        Ok(())
    }

    fn run(mut self, src: &str) -> Result<String> {
        let bytes = src.as_bytes();
        let mut out = String::with_capacity(src.len());
        let mut p = 0;

        loop {
            // Assemble one logical line: block comments are stripped, a
            // backslash before a newline continues the line. Newlines
            // consumed along the way are re-emitted afterwards to keep
            // the line count intact.
            let mut raw: Vec<u8> = vec![];
            let mut extra_newlines = 0;
            let mut in_comment = false;
            loop {
                if bytes[p..].starts_with(b"/*") {
                    in_comment = true;
                    p += 2;
                    continue;
                }
                if bytes[p..].starts_with(b"*/") {
                    in_comment = false;
                    p += 2;
                    continue;
                }
                if bytes[p..].starts_with(b"\\\n") {
                    p += 2;
                    self.line += 1;
                    extra_newlines += 1;
                    continue;
                }
                match bytes.get(p) {
                    None => {
                        if in_comment {
                            return Err(error!(PreproError, self.line;
                                "end of input inside a multi-line comment"));
                        }
                        break;
                    }
                    Some(b'\n') if !in_comment => break,
                    Some(b'\n') => {
                        self.line += 1;
                        extra_newlines += 1;
                        p += 1;
                    }
                    Some(&b) => {
                        if !in_comment {
                            raw.push(b);
                        }
                        p += 1;
                    }
                }
            }

            if !raw.is_empty() {
                let line = String::from_utf8_lossy(&raw).into_owned();
                let processed = self.process_line(&line, true)?;
                out.push_str(&processed);
            }
            for _ in 0..extra_newlines {
                out.push('\n');
            }

            if p >= bytes.len() {
                break;
            }
            out.push('\n');
            p += 1;
            self.line += 1;
        }

        if let Some(region) = self.regions.first() {
            return Err(error!(PreproError, region.line;
                "an if region is not closed with endif"));
        }
        Ok(out)
    }

    fn process_line(&mut self, line: &str, enable_directives: bool) -> Result<String> {
        let line = line.trim_start_matches(|c| c == ' ' || c == '\t');

        if !enable_directives || !line.starts_with('#') {
            let mut current = line.to_string();
            let mut passes = 0;
            loop {
                let (expanded, replaced) = self.expand_line(&current)?;
                if !replaced {
                    return Ok(expanded);
                }
                current = expanded;
                passes += 1;
                if passes > EXPAND_PASS_MAX {
                    return Err(error!(PreproError, self.line; format!(
                        "macro expansion did not settle after {} passes, possible infinite recursion",
                        passes
                    )));
                }
            }
        }

        self.directive(&line[1..])?;
        Ok(String::new())
    }

    fn directive(&mut self, rest: &str) -> Result<()> {
        let mut stream = TokenStream::new(rest);
        let name = self.read_pp(&mut stream)?;
        if name.tag != TokenTag::Identifier {
            return Err(error!(PreproError, self.line; "a directive name must follow #"));
        }
        let directive = Directive::from_name(&name.content).ok_or_else(
            || error!(PreproError, self.line; format!("unknown directive #{}", name.content)),
        )?;

        match directive {
            Directive::Define => {
                if self.is_valid() {
                    self.define(&mut stream, rest)?;
                }
            }
            Directive::Undef => {
                if self.is_valid() {
                    let it = self.read_pp(&mut stream)?;
                    let et = self.read_pp(&mut stream)?;
                    if it.tag != TokenTag::Identifier || et.tag != TokenTag::Eof {
                        return Err(error!(PreproError, self.line; "undef takes a single macro name"));
                    }
                    match self.find_macro(&it.content) {
                        Some(index) => {
                            self.macros.remove(index);
                        }
                        None => {
                            return Err(error!(PreproError, self.line;
                                format!("undef: macro not found ({})", it.content)));
                        }
                    }
                }
            }
            Directive::If => {
                let truthy = if self.is_valid() {
                    let tail = self.process_line(&rest[name.end..], false)?;
                    let value = self.eval_directive_expression(&tail)?;
                    value.boolean_literal()
                } else {
                    false
                };
                self.push_region(truthy)?;
            }
            Directive::Ifdef => {
                let it = self.read_pp(&mut stream)?;
                let et = self.read_pp(&mut stream)?;
                if it.tag != TokenTag::Identifier || et.tag != TokenTag::Eof {
                    return Err(error!(PreproError, self.line; "ifdef takes a single macro name"));
                }
                let has_macro = self.find_macro(&it.content).is_some();
                self.push_region(has_macro)?;
            }
            Directive::Endif => {
                let et = self.read_pp(&mut stream)?;
                if et.tag != TokenTag::Eof {
                    return Err(error!(PreproError, self.line; "unexpected token after endif"));
                }
                if self.regions.pop().is_none() {
                    return Err(error!(PreproError, self.line; "endif without a matching if"));
                }
            }
            Directive::Enum => {
                if self.is_valid() {
                    let it = self.read_pp(&mut stream)?;
                    if it.tag != TokenTag::Identifier {
                        return Err(error!(PreproError, self.line; "enum requires a macro name"));
                    }
                    let at = self.read_pp(&mut stream)?;
                    if at.tag == TokenTag::Assign {
                        let tail = self.process_line(&rest[at.end..], false)?;
                        match self.eval_directive_expression(&tail)? {
                            Val::Int(i) => self.enum_next = i,
                            _ => {
                                return Err(error!(PreproError, self.line;
                                    "enum requires an integer expression"));
                            }
                        }
                    } else if at.tag != TokenTag::Eof {
                        return Err(error!(PreproError, self.line; "unexpected token after enum"));
                    }
                    self.register_macro(Macro {
                        name: it.content,
                        is_ctype: false,
                        replacing: self.enum_next.to_string(),
                        params: vec![],
                    })?;
                    self.enum_next = self.enum_next.wrapping_add(1);
                }
            }
        }
        Ok(())
    }

    fn define(&mut self, stream: &mut TokenStream, rest: &str) -> Result<()> {
        let mut is_ctype = false;
        {
            let it = self.read_pp(stream)?;
            if it.tag == TokenTag::Identifier
                && Keyword::from_name(&it.content) == Some(Keyword::Ctype)
            {
                is_ctype = true;
            } else {
                stream.unread(1);
            }
        }

        let name = self.read_pp(stream)?;
        if name.tag != TokenTag::Identifier {
            return Err(error!(PreproError, self.line; "define requires a macro name"));
        }

        let mut params: Vec<MacroParam> = vec![];
        let replacing;

        let rt = self.read_pp(stream)?;
        if rt.tag == TokenTag::LParen {
            let mut is_break = false;
            loop {
                let ct = self.read_pp(stream)?;
                if ct.tag == TokenTag::Eof {
                    return Err(error!(PreproError, self.line;
                        "end of line while reading macro parameters"));
                }
                if ct.tag == TokenTag::RParen {
                    stream.unread(1);
                    break;
                }
                if ct.tag != TokenTag::PpArg {
                    return Err(error!(PreproError, self.line;
                        "macro parameters must start with %"));
                }

                let it = self.read_pp(stream)?;
                if it.tag != TokenTag::Integer || it.left_space {
                    return Err(error!(PreproError, self.line;
                        "% must be followed immediately by a parameter number"));
                }
                let index: usize = it.content.parse().unwrap_or(0);
                if index != params.len() + 1 {
                    return Err(error!(PreproError, self.line;
                        "macro parameters must be declared in order"));
                }
                if params.len() >= PARAM_MAX {
                    return Err(error!(PreproError, self.line; "too many macro parameters"));
                }

                let mut param = MacroParam {
                    default_param: None,
                };
                let at = self.read_pp(stream)?;
                match at.tag {
                    TokenTag::Assign => {
                        let mut depth = 0;
                        loop {
                            let nt = self.read_pp(stream)?;
                            if depth == 0
                                && (nt.tag == TokenTag::RParen || nt.tag == TokenTag::Comma)
                            {
                                param.default_param = Some(rest[at.end..nt.begin].to_string());
                                if nt.tag == TokenTag::RParen {
                                    is_break = true;
                                    stream.unread(1);
                                }
                                break;
                            }
                            match nt.tag {
                                TokenTag::LParen => depth += 1,
                                TokenTag::RParen => depth -= 1,
                                TokenTag::Eof => {
                                    return Err(error!(PreproError, self.line;
                                        "end of line while reading a parameter default"));
                                }
                                _ => {}
                            }
                        }
                    }
                    TokenTag::RParen => {
                        stream.unread(1);
                        is_break = true;
                    }
                    TokenTag::Comma => {}
                    _ => {
                        return Err(error!(PreproError, self.line; format!(
                            "unexpected token after a macro parameter [{}]",
                            at.content
                        )));
                    }
                }
                params.push(param);
                if is_break {
                    break;
                }
            }

            let close = self.read_pp(stream)?;
            if close.tag != TokenTag::RParen {
                return Err(error!(PreproError, self.line; format!(
                    "unexpected token in a macro parameter list [{}]",
                    close.content
                )));
            }
            replacing = rest[close.end..].to_string();
        } else {
            replacing = rest[rt.begin..].to_string();
        }

        self.register_macro(Macro {
            name: name.content,
            is_ctype,
            replacing,
            params,
        })
    }

    fn push_region(&mut self, valid_here: bool) -> Result<()> {
        if self.regions.len() >= REGION_MAX {
            return Err(error!(PreproError, self.line; "if regions nested too deeply"));
        }
        let valid = self.is_valid() && valid_here;
        self.regions.push(Region {
            valid,
            line: self.line,
        });
        Ok(())
    }

    fn eval_directive_expression(&self, text: &str) -> Result<Val> {
        let mut stream = TokenStream::new(text);
        let ast = parse_expression(&mut stream).map_err(|e| e.at_line(self.line))?;
        eval::evaluate_immediate(&ast).map_err(|e| e.at_line(self.line))
    }

    /// One expansion pass. Text between tokens is copied verbatim;
    /// identifier tokens that name a macro are replaced.
    fn expand_line(&self, line: &str) -> Result<(String, bool)> {
        if !self.is_valid() {
            return Ok((String::new(), false));
        }

        let mut out = String::with_capacity(line.len());
        let mut stream = TokenStream::new(line);
        let mut replaced = false;
        let mut prev: Option<Token> = None;

        loop {
            let st = self.read_pp(&mut stream)?;
            if let Some(p) = &prev {
                if st.begin > p.end {
                    out.push_str(&line[p.end..st.begin]);
                }
            }
            prev = Some(st.clone());

            if st.tag == TokenTag::Eof {
                break;
            }

            if st.tag == TokenTag::Identifier {
                if let Some(index) = self.find_macro(&st.content) {
                    let macro_ = &self.macros[index];
                    if macro_.params.is_empty() {
                        out.push_str(&macro_.replacing);
                    } else {
                        let args = self.read_macro_args(macro_, &mut stream, line)?;
                        // Skip the gap the argument list already consumed.
                        let next = self.read_pp(&mut stream)?;
                        stream.unread(1);
                        prev = Some(next);
                        self.render_replacement(macro_, &args, &mut out)?;
                    }
                    replaced = true;
                    continue;
                }
            }

            out.push_str(&line[st.begin..st.end]);
        }

        Ok((out, replaced))
    }

    fn read_macro_args(
        &self,
        macro_: &Macro,
        stream: &mut TokenStream,
        line: &str,
    ) -> Result<Vec<Option<String>>> {
        let parenthesized = if macro_.is_ctype {
            let lt = self.read_pp(stream)?;
            if lt.tag != TokenTag::LParen {
                return Err(error!(PreproError, self.line; format!(
                    "macro {} is ctype and must be called with parentheses",
                    macro_.name
                )));
            }
            true
        } else {
            let next = self.read_pp(stream)?;
            stream.unread(1);
            if next.tag == TokenTag::LParen && !next.left_space {
                self.read_pp(stream)?;
                true
            } else if next.left_space
                || next.tag == TokenTag::Eos
                || next.tag == TokenTag::Eof
            {
                false
            } else {
                return Err(error!(PreproError, self.line; format!(
                    "macro {} must be followed by whitespace or an argument list",
                    macro_.name
                )));
            }
        };

        let mut args: Vec<Option<String>> = vec![];
        'args: loop {
            let start = self.read_pp(stream)?;
            stream.unread(1);
            let mut depth = 0;
            loop {
                let nt = self.read_pp(stream)?;

                if nt.tag == TokenTag::Eos || nt.tag == TokenTag::Eof {
                    if depth > 0 || parenthesized {
                        return Err(error!(PreproError, self.line; format!(
                            "unexpected end of statement while reading arguments of macro {}",
                            macro_.name
                        )));
                    }
                    if args.len() >= macro_.params.len() {
                        return Err(error!(PreproError, self.line;
                            format!("too many arguments to macro {}", macro_.name)));
                    }
                    args.push(capture_arg(line, &start, &nt));
                    stream.unread(1);
                    break 'args;
                }

                let closes_list = parenthesized && nt.tag == TokenTag::RParen && depth == 0;
                if closes_list || (depth == 0 && nt.tag == TokenTag::Comma) {
                    if args.len() >= macro_.params.len() {
                        return Err(error!(PreproError, self.line;
                            format!("too many arguments to macro {}", macro_.name)));
                    }
                    args.push(capture_arg(line, &start, &nt));
                    if closes_list {
                        stream.unread(1);
                        break 'args;
                    }
                    break;
                }

                match nt.tag {
                    TokenTag::LParen => depth += 1,
                    TokenTag::RParen => depth -= 1,
                    _ => {}
                }
            }
        }

        if parenthesized {
            let close = self.read_pp(stream)?;
            if close.tag != TokenTag::RParen {
                return Err(error!(PreproError, self.line;
                    format!("argument list of macro {} is not closed", macro_.name)));
            }
        }

        for (i, param) in macro_.params.iter().enumerate() {
            let given = args.get(i).map_or(false, |a| a.is_some());
            if !given && param.default_param.is_none() {
                return Err(error!(PreproError, self.line; format!(
                    "argument {} of macro {} cannot be omitted",
                    i + 1,
                    macro_.name
                )));
            }
        }

        Ok(args)
    }

    fn render_replacement(
        &self,
        macro_: &Macro,
        args: &[Option<String>],
        out: &mut String,
    ) -> Result<()> {
        let rep = &macro_.replacing;
        let mut stream = TokenStream::new(rep);
        let mut prev: Option<Token> = None;

        loop {
            let ist = self.read_pp(&mut stream)?;
            if ist.tag == TokenTag::Eof {
                break;
            }

            if let Some(p) = &prev {
                if ist.begin > p.end {
                    out.push_str(&rep[p.end..ist.begin]);
                }
            }

            if ist.tag == TokenTag::PpArg {
                let it = self.read_pp(&mut stream)?;
                if it.tag != TokenTag::Integer || it.left_space {
                    return Err(error!(PreproError, self.line; format!(
                        "% in the replacement of macro {} must be followed by a parameter number",
                        macro_.name
                    )));
                }
                let index: usize = it.content.parse().unwrap_or(0);
                if index == 0 || index > macro_.params.len() {
                    return Err(error!(PreproError, self.line;
                        format!("macro {} has no parameter %{}", macro_.name, index)));
                }
                let text = args
                    .get(index - 1)
                    .and_then(|a| a.as_ref())
                    .or_else(|| macro_.params[index - 1].default_param.as_ref());
                if let Some(text) = text {
                    out.push_str(text);
                }
                prev = Some(it);
            } else {
                out.push_str(&rep[ist.begin..ist.end]);
                prev = Some(ist);
            }
        }

        if let Some(p) = &prev {
            out.push_str(&rep[p.end..]);
        }
        Ok(())
    }

    /// Reads one token of a directive or expansion line, relocating any
    /// lexical error to the line the preprocessor is working on.
    fn read_pp(&self, stream: &mut TokenStream) -> Result<Token> {
        stream.read().map_err(|e| e.at_line(self.line))
    }
}

fn capture_arg(line: &str, start: &Token, end: &Token) -> Option<String> {
    if start.begin == end.begin {
        return None;
    }
    Some(line[start.begin..end.begin].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(preprocess("a = 1\nmes \"x\"").unwrap(), "a = 1\nmes \"x\"");
    }

    #[test]
    fn test_simple_define() {
        let out = preprocess("#define FOO 42\nmes str(FOO)").unwrap();
        assert_eq!(out, "\nmes str(42)");
    }

    #[test]
    fn test_define_is_case_insensitive() {
        let out = preprocess("#define FOO 42\na = foo").unwrap();
        assert_eq!(out, "\na = 42");
    }

    #[test]
    fn test_parameterized_adjacent_parens() {
        let out = preprocess("#define SQ(%1) ((%1)*(%1))\na = SQ(3+1)").unwrap();
        assert_eq!(out, "\na = ((3+1)*(3+1))");
    }

    #[test]
    fn test_parameterized_open_form() {
        let out = preprocess("#define TWICE(%1) %1 %1\nTWICE mes \"x\"").unwrap();
        assert_eq!(out, "\nmes \"x\" mes \"x\"");
    }

    #[test]
    fn test_parameter_default() {
        let out = preprocess("#define ADD(%1, %2 = 10) (%1 + %2)\na = ADD(1)").unwrap();
        assert_eq!(out, "\na = (1 +  10)");
    }

    #[test]
    fn test_missing_argument_without_default_is_error() {
        assert!(preprocess("#define ADD(%1, %2) (%1 + %2)\na = ADD(1)").is_err());
    }

    #[test]
    fn test_ctype_requires_parens() {
        assert!(preprocess("#define ctype F(%1) (%1)\na = F 1").is_err());
        assert_eq!(
            preprocess("#define ctype F(%1) (%1)\na = F(1)").unwrap(),
            "\na = (1)"
        );
    }

    #[test]
    fn test_undef() {
        let out = preprocess("#define A 1\n#undef A\n#define A 2\nx = A").unwrap();
        assert_eq!(out, "\n\n\nx = 2");
        assert!(preprocess("#undef NOPE").is_err());
    }

    #[test]
    fn test_redefinition_is_error() {
        assert!(preprocess("#define A 1\n#define A 2").is_err());
    }

    #[test]
    fn test_if_regions() {
        let out = preprocess("#if 1\na = 1\n#endif\n#if 0\nb = 2\n#endif").unwrap();
        assert_eq!(out, "\na = 1\n\n\n\n");
    }

    #[test]
    fn test_inactive_region_defines_nothing() {
        let out = preprocess("#if 0\n#define A 9\n#enum B\n#endif\nx = 1").unwrap();
        assert_eq!(out, "\n\n\n\nx = 1");
        // B was not registered, so an #ifdef on it stays inactive.
        let out = preprocess("#if 0\n#define A 9\n#endif\n#ifdef A\nx = 1\n#endif").unwrap();
        assert_eq!(out, "\n\n\n\n\n");
    }

    #[test]
    fn test_ifdef() {
        let out = preprocess("#define A 1\n#ifdef A\nx = 1\n#endif").unwrap();
        assert_eq!(out, "\n\nx = 1\n");
    }

    #[test]
    fn test_unbalanced_regions_are_errors() {
        assert!(preprocess("#if 1\na = 1").is_err());
        assert!(preprocess("#endif").is_err());
    }

    #[test]
    fn test_enum_sequence() {
        let out = preprocess("#enum A\n#enum B\n#enum C = 10\n#enum D\nx = A : x = B : x = C : x = D")
            .unwrap();
        assert_eq!(out, "\n\n\n\nx = 0 : x = 1 : x = 10 : x = 11");
    }

    #[test]
    fn test_enum_requires_int() {
        assert!(preprocess("#enum A = 1.5").is_err());
    }

    #[test]
    fn test_default_m_pi() {
        let out = preprocess("pi = M_PI").unwrap();
        assert_eq!(out, "pi = 3.141592653589793238");
    }

    #[test]
    fn test_recursive_macro_is_error() {
        let err = preprocess("#define A B\n#define B A\nx = A").unwrap_err();
        assert!(err.to_string().contains("recursion"), "{}", err);
    }

    #[test]
    fn test_line_continuation_keeps_line_count() {
        let out = preprocess("a = 1 + \\\n2\nb = 3").unwrap();
        assert_eq!(out, "a = 1 + 2\n\nb = 3");
    }

    #[test]
    fn test_block_comment_keeps_line_count() {
        let out = preprocess("a = /* x\ny */ 1\nb = 2").unwrap();
        assert_eq!(out, "a =  1\n\nb = 2");
    }

    #[test]
    fn test_if_expression_uses_macros() {
        let out = preprocess("#define N 3\n#if N > 2\nx = 1\n#endif").unwrap();
        assert_eq!(out, "\n\nx = 1\n");
    }
}
