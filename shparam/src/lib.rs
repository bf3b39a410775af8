#![doc = include_str!("../README.md")]

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use biometrics::Counter;
use indicio::{clue, ERROR, INFO};

pub mod scanner;

use scanner::{Operator, Scanner, Token};

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static EXPAND: Counter = Counter::new("shparam.expand");
static ASSIGN: Counter = Counter::new("shparam.assign");
static DRAIN: Counter = Counter::new("shparam.drain");
static UNTERMINATED_EXPANSION: Counter = Counter::new("shparam.error.unterminated_expansion");
static PARAMETER_NULL_OR_UNSET: Counter = Counter::new("shparam.error.parameter_null_or_unset");
static ASSIGNMENT_UNSUPPORTED: Counter = Counter::new("shparam.error.assignment_unsupported");
static ASSIGNMENT_FAILED: Counter = Counter::new("shparam.error.assignment_failed");
static BAD_SUBSTITUTION: Counter = Counter::new("shparam.error.bad_substitution");

/// Register this crate's biometrics with the provided Collector.
pub fn register_biometrics(collector: &biometrics::Collector) {
    collector.register_counter(&EXPAND);
    collector.register_counter(&ASSIGN);
    collector.register_counter(&DRAIN);
    collector.register_counter(&UNTERMINATED_EXPANSION);
    collector.register_counter(&PARAMETER_NULL_OR_UNSET);
    collector.register_counter(&ASSIGNMENT_UNSUPPORTED);
    collector.register_counter(&ASSIGNMENT_FAILED);
    collector.register_counter(&BAD_SUBSTITUTION);
}

////////////////////////////////////////////// indicio /////////////////////////////////////////////

/// The collector for this crate's clues.
pub static COLLECTOR: indicio::Collector = indicio::Collector::new();

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// An error occurred during expansion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The input ended before the closing `}` or `'` was found.
    UnterminatedExpansion { delimiter: char },
    /// The user-requested `${FOO:?ERROR MESSAGE}` form returns `"ERROR MESSAGE"` via this
    /// variant, or `"FOO: parameter null or not set"` when the message is empty.
    ParameterNullOrUnset { message: String },
    /// `${FOO=word}` fired against a provider that cannot assign.
    AssignmentUnsupported { ident: String },
    /// The provider refused the assignment of `ident`.
    AssignmentFailed { ident: String, cause: String },
    /// The body of a `${...}` is not valid parameter syntax.
    BadSubstitution { text: String },
}

impl Error {
    fn unterminated_expansion(delimiter: char) -> Self {
        UNTERMINATED_EXPANSION.click();
        Self::UnterminatedExpansion { delimiter }
    }

    fn parameter_null_or_unset(ident: &str, message: String) -> Self {
        PARAMETER_NULL_OR_UNSET.click();
        let message = if message.is_empty() {
            format!("{ident}: parameter null or not set")
        } else {
            message
        };
        Self::ParameterNullOrUnset { message }
    }

    fn assignment_unsupported(ident: &str) -> Self {
        ASSIGNMENT_UNSUPPORTED.click();
        Self::AssignmentUnsupported {
            ident: ident.to_string(),
        }
    }

    fn assignment_failed(ident: &str, cause: String) -> Self {
        ASSIGNMENT_FAILED.click();
        Self::AssignmentFailed {
            ident: ident.to_string(),
            cause,
        }
    }

    fn bad_substitution(text: String) -> Self {
        BAD_SUBSTITUTION.click();
        Self::BadSubstitution { text }
    }
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnterminatedExpansion { delimiter } => {
                write!(fmt, "unexpected EOF while looking for matching `{delimiter}'")
            }
            Error::ParameterNullOrUnset { message } => write!(fmt, "{message}"),
            Error::AssignmentUnsupported { ident } => {
                write!(fmt, "{ident}: variable provider does not support assignment")
            }
            Error::AssignmentFailed { ident, cause } => {
                write!(fmt, "{ident}: cannot assign: {cause}")
            }
            Error::BadSubstitution { text } => write!(fmt, "{text}: bad substitution"),
        }
    }
}

impl std::error::Error for Error {}

///////////////////////////////////////// VariableProvider /////////////////////////////////////////

/// A VariableProvider provides a way to lookup the value of a variable.
///
/// `None` means the variable is unset; `Some("")` means it is set but null.  It is expected that
/// the provider do no expansion of its own.
pub trait VariableProvider {
    fn lookup(&self, ident: &str) -> Option<String>;

    /// The assignment capability of this provider, if it has one.
    fn assigner(&mut self) -> Option<&mut dyn VariableAssigner> {
        None
    }
}

impl VariableProvider for () {
    fn lookup(&self, _: &str) -> Option<String> {
        None
    }
}

impl<K: Borrow<str> + Eq + Hash, V: AsRef<str>> VariableProvider for HashMap<K, V> {
    fn lookup(&self, ident: &str) -> Option<String> {
        self.get(ident).map(|s| s.as_ref().to_string())
    }
}

///////////////////////////////////////// VariableAssigner /////////////////////////////////////////

/// A VariableAssigner stores the value `${FOO=word}` computes for `FOO`.
pub trait VariableAssigner {
    fn assign(&mut self, ident: &str, value: &str) -> Result<(), String>;
}

///////////////////////////////////////////// LookupFn /////////////////////////////////////////////

/// A read-only provider backed by a function.
pub struct LookupFn<F: Fn(&str) -> Option<String>>(pub F);

impl<F: Fn(&str) -> Option<String>> VariableProvider for LookupFn<F> {
    fn lookup(&self, ident: &str) -> Option<String> {
        (self.0)(ident)
    }
}

///////////////////////////////////////// WritableVariables ////////////////////////////////////////

/// An in-memory provider that accepts assignments.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WritableVariables {
    vars: HashMap<String, String>,
}

impl WritableVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ident: &str) -> Option<&str> {
        self.vars.get(ident).map(String::as_str)
    }

    pub fn insert(&mut self, ident: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(ident.into(), value.into());
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.vars
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WritableVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let vars = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { vars }
    }
}

impl From<HashMap<String, String>> for WritableVariables {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl VariableProvider for WritableVariables {
    fn lookup(&self, ident: &str) -> Option<String> {
        self.vars.get(ident).cloned()
    }

    fn assigner(&mut self) -> Option<&mut dyn VariableAssigner> {
        Some(self)
    }
}

impl VariableAssigner for WritableVariables {
    fn assign(&mut self, ident: &str, value: &str) -> Result<(), String> {
        self.vars.insert(ident.to_string(), value.to_string());
        Ok(())
    }
}

//////////////////////////////////////////// Environment ///////////////////////////////////////////

/// A provider over the process environment.
///
/// Lookups read the environment at the time of the lookup.  Assignments write the environment of
/// the current process.  Variables whose values are not valid unicode read lossily.
#[derive(Clone, Copy, Debug, Default)]
pub struct Environment {
    _private: (),
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariableProvider for Environment {
    fn lookup(&self, ident: &str) -> Option<String> {
        std::env::var_os(ident).map(|v| v.to_string_lossy().into_owned())
    }

    fn assigner(&mut self) -> Option<&mut dyn VariableAssigner> {
        Some(self)
    }
}

impl VariableAssigner for Environment {
    fn assign(&mut self, ident: &str, value: &str) -> Result<(), String> {
        if ident.is_empty() || ident.contains(|c: char| c == '=' || c == '\0') {
            return Err(format!("invalid environment variable name {ident:?}"));
        }
        if value.contains('\0') {
            return Err("value contains a NUL byte".to_string());
        }
        std::env::set_var(ident, value);
        Ok(())
    }
}

////////////////////////////////////////////// evaluate ////////////////////////////////////////////

// An operand under evaluation.  `outer` holds the output of the enclosing level until the operand's
// EndBracket arrives.
struct Frame {
    ident: String,
    op: Operator,
    outer: String,
}

// Evaluate tokens until the stream ends.  Operands nest on an explicit stack of frames so that
// nesting depth is bounded by memory rather than by the call stack.
fn evaluate(vars: &mut dyn VariableProvider, tokens: &mut Scanner) -> Result<String, Error> {
    let mut frames: Vec<Frame> = vec![];
    let mut output = String::new();
    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => {
                output.push_str(&text);
            }
            Token::ReadParam(ident) => {
                if let Some(val) = vars.lookup(&ident) {
                    output.push_str(&val);
                }
            }
            Token::ParamLen(ident) => {
                let len = vars.lookup(&ident).map(|v| v.chars().count()).unwrap_or(0);
                output.push_str(&len.to_string());
            }
            Token::ParamOp {
                ident,
                op,
                null_is_empty,
            } => {
                if let Some(val) = resolve(vars, tokens, &ident, op, null_is_empty)? {
                    output.push_str(&val);
                } else {
                    let outer = std::mem::take(&mut output);
                    frames.push(Frame { ident, op, outer });
                }
            }
            Token::EndBracket => {
                // The scanner only emits EndBracket to close the operand of a ParamOp; a stray
                // one at the top level is a literal brace like any other `}` outside a bracket.
                if let Some(frame) = frames.pop() {
                    let word = std::mem::replace(&mut output, frame.outer);
                    let val = finish(vars, &frame.ident, frame.op, word)?;
                    output.push_str(&val);
                } else {
                    output.push('}');
                }
            }
            Token::UnexpectedEnd(delimiter) => {
                return Err(Error::unterminated_expansion(delimiter));
            }
            Token::BadSubstitution(text) => {
                return Err(Error::bad_substitution(text));
            }
        }
    }
    if frames.is_empty() {
        Ok(output)
    } else {
        Err(Error::unterminated_expansion('}'))
    }
}

// Decide a ParamOp whose operand has not yet been read.  Returns the value when the operand is
// drained, or None when the operand must be evaluated and handed to `finish`.
fn resolve(
    vars: &mut dyn VariableProvider,
    tokens: &mut Scanner,
    ident: &str,
    op: Operator,
    null_is_empty: bool,
) -> Result<Option<String>, Error> {
    let val = vars.lookup(ident);
    let is_set = match &val {
        Some(val) => !null_is_empty || !val.is_empty(),
        None => false,
    };
    match (op, val) {
        (Operator::Alternative, _) if is_set => Ok(None),
        (Operator::Alternative, _) => {
            drain(tokens)?;
            Ok(Some(String::new()))
        }
        (_, Some(val)) if is_set => {
            drain(tokens)?;
            Ok(Some(val))
        }
        _ => Ok(None),
    }
}

// Apply `op` to the evaluated operand `word`.
fn finish(
    vars: &mut dyn VariableProvider,
    ident: &str,
    op: Operator,
    word: String,
) -> Result<String, Error> {
    match op {
        Operator::Alternative | Operator::Default => Ok(word),
        Operator::AssignDefault => {
            let Some(assigner) = vars.assigner() else {
                return Err(Error::assignment_unsupported(ident));
            };
            if let Err(cause) = assigner.assign(ident, &word) {
                return Err(Error::assignment_failed(ident, cause));
            }
            ASSIGN.click();
            clue!(COLLECTOR, INFO, {
                assign: ident,
                value: word.as_str(),
            });
            Ok(word)
        }
        Operator::ErrorIfUnset => Err(Error::parameter_null_or_unset(ident, word)),
    }
}

// Discard the rest of the current operand, including its EndBracket, without consulting any
// provider.  Malformed input is still reported.
fn drain(tokens: &mut Scanner) -> Result<(), Error> {
    DRAIN.click();
    let mut depth = 0usize;
    for token in tokens.by_ref() {
        match token {
            Token::ParamOp { .. } => {
                depth += 1;
            }
            Token::EndBracket if depth == 0 => {
                return Ok(());
            }
            Token::EndBracket => {
                depth -= 1;
            }
            Token::UnexpectedEnd(delimiter) => {
                return Err(Error::unterminated_expansion(delimiter));
            }
            Token::BadSubstitution(text) => {
                return Err(Error::bad_substitution(text));
            }
            Token::Text(_) | Token::ReadParam(_) | Token::ParamLen(_) => {}
        }
    }
    Err(Error::unterminated_expansion('}'))
}

/////////////////////////////////////////////// expand /////////////////////////////////////////////

/// Expand the parameter references in `input` against `vars`.
///
/// The result is either the complete expansion or the first error encountered; `${FOO=word}`
/// assignments made before an error remain in effect.
pub fn expand(vars: &mut dyn VariableProvider, input: &str) -> Result<String, Error> {
    EXPAND.click();
    let mut tokens = Scanner::new(input);
    let result = evaluate(vars, &mut tokens);
    tokens.close();
    if let Err(err) = &result {
        clue!(COLLECTOR, ERROR, {
            input: input,
            error: err.to_string(),
        });
    }
    result
}

/// Expand the parameter references in `input` against the process environment.
pub fn expand_with_environment(input: &str) -> Result<String, Error> {
    expand(&mut Environment::new(), input)
}

/// Return the identifiers `input` refers to, in order of first appearance.
///
/// Nothing is looked up or assigned; identifiers inside every operand are reported.
pub fn referenced(input: &str) -> Result<Vec<String>, Error> {
    let mut idents: Vec<String> = vec![];
    let mut witness = |ident: String| {
        if !idents.contains(&ident) {
            idents.push(ident);
        }
    };
    for token in Scanner::new(input) {
        match token {
            Token::ReadParam(ident) | Token::ParamLen(ident) | Token::ParamOp { ident, .. } => {
                witness(ident);
            }
            Token::Text(_) | Token::EndBracket => {}
            Token::UnexpectedEnd(delimiter) => {
                return Err(Error::unterminated_expansion(delimiter));
            }
            Token::BadSubstitution(text) => {
                return Err(Error::bad_substitution(text));
            }
        }
    }
    Ok(idents)
}

/////////////////////////////////////////// ExpandOptions //////////////////////////////////////////

/// Options for the `shparam` command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "command_line", derive(arrrg_derive::CommandLine))]
pub struct ExpandOptions {
    #[cfg_attr(
        feature = "command_line",
        arrrg(optional, "Template file to expand (default: stdin).")
    )]
    pub input: Option<String>,
    #[cfg_attr(
        feature = "command_line",
        arrrg(flag, "Ignore the process environment; only KEY=VALUE arguments are visible.")
    )]
    pub isolate: bool,
    #[cfg_attr(feature = "command_line", arrrg(flag, "Log clues to stderr."))]
    pub verbose: bool,
}

impl ExpandOptions {
    /// Build the provider these options describe from `KEY=VALUE` definitions.
    ///
    /// Definitions override the environment.  Assignments land in the returned provider and never
    /// reach the process environment.
    pub fn variables<S: AsRef<str>>(&self, defines: &[S]) -> Result<WritableVariables, String> {
        let mut vars = if self.isolate {
            WritableVariables::new()
        } else {
            std::env::vars_os()
                .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
                .collect()
        };
        for define in defines {
            let define = define.as_ref();
            let Some((ident, value)) = define.split_once('=') else {
                return Err(format!("expected KEY=VALUE, got {define:?}"));
            };
            if !scanner::is_ident(ident) {
                return Err(format!("invalid variable name {ident:?}"));
            }
            vars.insert(ident, value);
        }
        Ok(vars)
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn posix() -> HashMap<&'static str, &'static str> {
        HashMap::from([("set", "yes"), ("set2", "yes-two"), ("null", "")])
    }

    #[test]
    fn sample_expansion() {
        let mut env: HashMap<&str, &str> =
            HashMap::from([("FOO", "foo"), ("BAR", "bar"), ("BAZ", "baz")]);
        assert_eq!(
            "foo-bar-baz",
            expand(&mut env, "${FOO}-${BAR}-${BAZ}").unwrap()
        );
    }

    #[test]
    fn expand_all_empty() {
        let mut env: HashMap<&str, &str> = HashMap::from([("s1", ""), ("s2", ""), ("s3", "")]);
        assert_eq!("", expand(&mut env, "${s1}${s2}${s3}").unwrap());
        assert_eq!("\"\"", expand(&mut env, "${s1}\"${s2}\"${s3}").unwrap());
    }

    #[test]
    fn whitespace_is_preserved() {
        let mut env: HashMap<&str, &str> = HashMap::from([("FOOSPACE", " foo ")]);
        assert_eq!("  foo  ", expand(&mut env, " ${FOOSPACE} ").unwrap());
    }

    #[test]
    fn length_counts_characters() {
        let mut env: HashMap<&str, &str> = HashMap::from([("snow", "☃☃")]);
        assert_eq!("2", expand(&mut env, "${#snow}").unwrap());
    }

    #[test]
    fn null_counts_as_set_without_colon() {
        assert_eq!("", expand(&mut posix(), "${null?word}").unwrap());
        assert_eq!("", expand(&mut posix(), "${null?}").unwrap());
        assert_eq!(
            Err(Error::ParameterNullOrUnset {
                message: "word".to_string()
            }),
            expand(&mut posix(), "${null:?word}")
        );
    }

    #[test]
    fn drained_operand_is_not_evaluated() {
        let mut vars = WritableVariables::from_iter([("set", "yes")]);
        assert_eq!("yes", expand(&mut vars, "${set:-${x:=1}}").unwrap());
        assert_eq!(None, vars.get("x"));
        assert_eq!("", expand(&mut vars, "${unset:+${x:=1}}").unwrap());
        assert_eq!(None, vars.get("x"));
        assert_eq!("yes", expand(&mut vars, "${set:?${x:=1}}").unwrap());
        assert_eq!(None, vars.get("x"));
    }

    #[test]
    fn siblings_after_operand_are_expanded() {
        assert_eq!("[]yes", expand(&mut posix(), "[${unset+x}]$set").unwrap());
        assert_eq!("yes.yes-two", expand(&mut posix(), "${set-a}.${set2}").unwrap());
    }

    #[test]
    fn malformed_drained_operand_is_an_error() {
        assert_eq!(
            Err(Error::UnterminatedExpansion { delimiter: '}' }),
            expand(&mut posix(), "${set-foo")
        );
        assert_eq!(
            Err(Error::UnterminatedExpansion { delimiter: '\'' }),
            expand(&mut posix(), "${set-'foo}")
        );
    }

    #[test]
    fn error_stops_evaluation() {
        let mut vars = WritableVariables::new();
        assert_eq!(
            Err(Error::ParameterNullOrUnset {
                message: "a: parameter null or not set".to_string()
            }),
            expand(&mut vars, "${a:?}${b:=2}")
        );
        assert_eq!(None, vars.get("b"));
    }

    fn nested(open: &str, inner: &str, n: usize) -> String {
        format!("{}{}{}", open.repeat(n), inner, "}".repeat(n))
    }

    #[test]
    fn deeply_nested_operands() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        assert_eq!(
            Ok("x".to_string()),
            expand(&mut env, &nested("${u-", "x", 100_000))
        );
        assert_eq!(
            Ok("yes".to_string()),
            expand(&mut posix(), &nested("${set-", "x", 100_000))
        );
        assert_eq!(
            Ok("x".to_string()),
            expand(&mut posix(), &nested("${set+", "x", 100_000))
        );
        assert_eq!(
            Err(Error::ParameterNullOrUnset {
                message: "x".to_string()
            }),
            expand(&mut env, &nested("${u:?", "x", 100_000))
        );
        assert_eq!(
            Err(Error::UnterminatedExpansion { delimiter: '}' }),
            expand(&mut env, &format!("{}x", "${u-".repeat(100_000)))
        );
    }

    #[test]
    fn deeply_nested_assignments() {
        let mut vars = WritableVariables::new();
        assert_eq!(
            Ok("x".to_string()),
            expand(&mut vars, &nested("${a:=", "x", 10_000))
        );
        assert_eq!(Some("x"), vars.get("a"));
    }

    #[test]
    fn assignment_is_visible_later_in_the_same_template() {
        let mut vars = WritableVariables::new();
        assert_eq!("x-x", expand(&mut vars, "${a=x}-$a").unwrap());
        assert_eq!(Some("x"), vars.get("a"));
    }

    #[test]
    fn assignment_unsupported() {
        assert_eq!(
            Err(Error::AssignmentUnsupported {
                ident: "unset".to_string()
            }),
            expand(&mut posix(), "${unset:=word}")
        );
        assert_eq!(
            Err(Error::AssignmentUnsupported {
                ident: "unset".to_string()
            }),
            expand(&mut (), "${unset:=word}")
        );
        assert_eq!("yes", expand(&mut posix(), "${set:=word}").unwrap());
    }

    struct Refusing;

    impl VariableProvider for Refusing {
        fn lookup(&self, _: &str) -> Option<String> {
            None
        }

        fn assigner(&mut self) -> Option<&mut dyn VariableAssigner> {
            Some(self)
        }
    }

    impl VariableAssigner for Refusing {
        fn assign(&mut self, _: &str, _: &str) -> Result<(), String> {
            Err("read-only".to_string())
        }
    }

    #[test]
    fn assignment_failed() {
        let err = expand(&mut Refusing, "${FOO=bar}").unwrap_err();
        assert_eq!(
            Error::AssignmentFailed {
                ident: "FOO".to_string(),
                cause: "read-only".to_string(),
            },
            err
        );
        assert_eq!("FOO: cannot assign: read-only", err.to_string());
    }

    #[test]
    fn lookup_fn() {
        let mut vars = LookupFn(|ident: &str| {
            if ident.starts_with('X') {
                Some(ident.to_lowercase())
            } else {
                None
            }
        });
        assert_eq!("xa-b", expand(&mut vars, "${XA}-${Y:-b}").unwrap());
        assert!(matches!(
            expand(&mut vars, "${Y:=b}"),
            Err(Error::AssignmentUnsupported { .. })
        ));
    }

    #[test]
    fn environment() {
        let mut env = Environment::new();
        std::env::set_var("SHPARAM_TEST_ENVIRONMENT_SET", "value");
        std::env::remove_var("SHPARAM_TEST_ENVIRONMENT_UNSET");
        assert_eq!(
            "value/default",
            expand(
                &mut env,
                "${SHPARAM_TEST_ENVIRONMENT_SET}/${SHPARAM_TEST_ENVIRONMENT_UNSET:-default}"
            )
            .unwrap()
        );
        assert_eq!(
            "assigned",
            expand_with_environment("${SHPARAM_TEST_ENVIRONMENT_UNSET:=assigned}").unwrap()
        );
        assert_eq!(
            Ok("assigned".to_string()),
            std::env::var("SHPARAM_TEST_ENVIRONMENT_UNSET")
        );
        std::env::remove_var("SHPARAM_TEST_ENVIRONMENT_UNSET");
    }

    #[test]
    fn environment_rejects_nul() {
        let err = Environment::new()
            .assign("SHPARAM_TEST_ENVIRONMENT_NUL", "a\0b")
            .unwrap_err();
        assert_eq!("value contains a NUL byte", err);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            "unexpected EOF while looking for matching `}'",
            Error::UnterminatedExpansion { delimiter: '}' }.to_string()
        );
        assert_eq!(
            "unexpected EOF while looking for matching `''",
            Error::UnterminatedExpansion { delimiter: '\'' }.to_string()
        );
        assert_eq!(
            "${a b: bad substitution",
            expand(&mut (), "${a b}").unwrap_err().to_string()
        );
    }

    #[test]
    fn referenced_idents() {
        assert_eq!(
            vec!["a", "b", "c", "d"],
            referenced("$a ${b:-${c}} ${#d} $a ${b}").unwrap()
        );
        assert_eq!(Vec::<String>::new(), referenced("no params \\$here").unwrap());
        assert_eq!(
            Err(Error::UnterminatedExpansion { delimiter: '}' }),
            referenced("${a:-")
        );
    }

    #[test]
    fn options_variables() {
        let options = ExpandOptions {
            isolate: true,
            ..ExpandOptions::default()
        };
        let mut vars = options.variables(&["A=1", "B=x=y", "C="]).unwrap();
        assert_eq!(Some("1"), vars.get("A"));
        assert_eq!(Some("x=y"), vars.get("B"));
        assert_eq!("1 x=y ", expand(&mut vars, "$A $B ${C:-}").unwrap());
        assert!(options.variables(&["A"]).is_err());
        assert!(options.variables(&["1A=2"]).is_err());
    }

    proptest::proptest! {
        #[test]
        fn dollar_free_strings_are_fixed_points(s in "[^$]*") {
            assert_eq!(s.clone(), expand(&mut posix(), &s).unwrap());
        }

        #[test]
        fn expand_never_panics(s in "[${}#:+=?'\"\\\\a-c -]{0,24}") {
            let mut vars = WritableVariables::from_iter([("a", "x"), ("b", "")]);
            let _ = expand(&mut vars, &s);
        }
    }
}
