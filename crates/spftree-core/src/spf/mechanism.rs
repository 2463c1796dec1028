//! SPF term parsing
//!
//! Turns one SPF record string into an ordered list of typed terms. Parsing
//! never fails: terms this crate does not interpret are kept as
//! [`Mechanism::Unknown`] so newer record syntax cannot abort a walk.

use std::fmt;

/// Version tag every SPF record starts with
pub const SPF_VERSION: &str = "v=spf1";

/// SPF qualifier (prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qualifier {
    #[default]
    Pass, // + (default)
    Fail,     // -
    SoftFail, // ~
    Neutral,  // ?
}

impl Qualifier {
    /// Split a leading qualifier character off a term
    pub fn strip_prefix(term: &str) -> (Qualifier, &str) {
        match term.as_bytes().first() {
            Some(b'+') => (Qualifier::Pass, &term[1..]),
            Some(b'-') => (Qualifier::Fail, &term[1..]),
            Some(b'~') => (Qualifier::SoftFail, &term[1..]),
            Some(b'?') => (Qualifier::Neutral, &term[1..]),
            _ => (Qualifier::Pass, term),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Qualifier::Pass => '+',
            Qualifier::Fail => '-',
            Qualifier::SoftFail => '~',
            Qualifier::Neutral => '?',
        }
    }

    /// The catch-all term this qualifier forms, e.g. `-all`
    pub fn all_term(self) -> &'static str {
        match self {
            Qualifier::Pass => "+all",
            Qualifier::Fail => "-all",
            Qualifier::SoftFail => "~all",
            Qualifier::Neutral => "?all",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// SPF mechanism or interpreted modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mechanism {
    All,
    Include(String),
    A(Option<String>),
    Mx(Option<String>),
    Ip4(String),
    Ip6(String),
    Exists(String),
    Ptr(Option<String>),
    /// `redirect=` modifier
    Redirect(String),
    /// Anything else, kept verbatim
    Unknown(String),
}

impl Mechanism {
    /// DNS lookups this term charges against the RFC 7208 §4.6.4 budget
    pub fn lookup_cost(&self) -> u32 {
        match self {
            Mechanism::Include(_)
            | Mechanism::A(_)
            | Mechanism::Mx(_)
            | Mechanism::Exists(_)
            | Mechanism::Ptr(_)
            | Mechanism::Redirect(_) => 1,
            Mechanism::All | Mechanism::Ip4(_) | Mechanism::Ip6(_) | Mechanism::Unknown(_) => 0,
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::All => write!(f, "all"),
            Mechanism::Include(d) => write!(f, "include:{}", d),
            Mechanism::A(None) => write!(f, "a"),
            Mechanism::A(Some(d)) => write!(f, "a:{}", d),
            Mechanism::Mx(None) => write!(f, "mx"),
            Mechanism::Mx(Some(d)) => write!(f, "mx:{}", d),
            Mechanism::Ip4(v) => write!(f, "ip4:{}", v),
            Mechanism::Ip6(v) => write!(f, "ip6:{}", v),
            Mechanism::Exists(d) => write!(f, "exists:{}", d),
            Mechanism::Ptr(None) => write!(f, "ptr"),
            Mechanism::Ptr(Some(d)) => write!(f, "ptr:{}", d),
            Mechanism::Redirect(d) => write!(f, "redirect={}", d),
            Mechanism::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Parsed SPF term (qualifier + mechanism)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub qualifier: Qualifier,
    pub mechanism: Mechanism,
}

impl Term {
    fn new(qualifier: Qualifier, mechanism: Mechanism) -> Self {
        Self {
            qualifier,
            mechanism,
        }
    }

    fn unknown(raw: &str) -> Self {
        Self::new(Qualifier::Pass, Mechanism::Unknown(raw.to_string()))
    }
}

/// Whether a TXT string is an SPF record (`v=spf1` followed by a space or the end)
pub fn is_spf_record(txt: &str) -> bool {
    let bytes = txt.as_bytes();
    bytes.len() >= SPF_VERSION.len()
        && bytes[..SPF_VERSION.len()].eq_ignore_ascii_case(SPF_VERSION.as_bytes())
        && bytes
            .get(SPF_VERSION.len())
            .map_or(true, |b| b.is_ascii_whitespace())
}

/// Parse an SPF record into terms, in source order
pub fn parse_record(record: &str) -> Vec<Term> {
    let mut tokens = record.split_whitespace().peekable();
    if tokens
        .peek()
        .is_some_and(|first| first.eq_ignore_ascii_case(SPF_VERSION))
    {
        tokens.next();
    }

    tokens.map(parse_term).collect()
}

/// Whether `redirect=` applies to a record with these terms
///
/// A record with an `all` mechanism never reaches its redirect
/// (RFC 7208 §6.1), so the modifier is ignored and costs nothing.
pub fn redirect_applies(terms: &[Term]) -> bool {
    !terms.iter().any(|t| t.mechanism == Mechanism::All)
}

/// Lookups a whole record charges, honoring [`redirect_applies`]
pub fn record_lookup_cost(terms: &[Term]) -> u32 {
    let follow_redirect = redirect_applies(terms);
    terms
        .iter()
        .filter(|t| follow_redirect || !matches!(t.mechanism, Mechanism::Redirect(_)))
        .map(|t| t.mechanism.lookup_cost())
        .sum()
}

/// Parse a single term
pub fn parse_term(token: &str) -> Term {
    if let Some(term) = parse_modifier(token) {
        return term;
    }

    let (qualifier, body) = Qualifier::strip_prefix(token);

    let (name, arg) = match body.find(&[':', '/'][..]) {
        Some(pos) if body.as_bytes()[pos] == b':' => (&body[..pos], Some(&body[pos + 1..])),
        // `a/24`, `mx//64`: a CIDR suffix without a domain
        Some(pos) => (&body[..pos], None),
        None => (body, None),
    };

    let mechanism = match name.to_ascii_lowercase().as_str() {
        "all" if arg.is_none() && body.len() == name.len() => Mechanism::All,
        "include" => match required(arg) {
            Some(domain) => Mechanism::Include(domain),
            None => return Term::unknown(token),
        },
        "a" => match optional_domain(arg) {
            Ok(domain) => Mechanism::A(domain),
            Err(()) => return Term::unknown(token),
        },
        "mx" => match optional_domain(arg) {
            Ok(domain) => Mechanism::Mx(domain),
            Err(()) => return Term::unknown(token),
        },
        "ip4" => match arg.filter(|v| !v.is_empty()) {
            Some(value) => Mechanism::Ip4(value.to_string()),
            None => return Term::unknown(token),
        },
        "ip6" => match arg.filter(|v| !v.is_empty()) {
            Some(value) => Mechanism::Ip6(value.to_string()),
            None => return Term::unknown(token),
        },
        "exists" => match required(arg) {
            Some(domain) => Mechanism::Exists(domain),
            None => return Term::unknown(token),
        },
        "ptr" => match optional_domain(arg) {
            Ok(domain) => Mechanism::Ptr(domain),
            Err(()) => return Term::unknown(token),
        },
        _ => return Term::unknown(token),
    };

    Term::new(qualifier, mechanism)
}

/// `name=value` terms; only `redirect` is interpreted
fn parse_modifier(token: &str) -> Option<Term> {
    let (name, value) = token.split_once('=')?;
    let is_name_char = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.');
    if name.is_empty() || !name.bytes().all(is_name_char) {
        return None;
    }

    if name.eq_ignore_ascii_case("redirect") && !value.is_empty() {
        Some(Term::new(Qualifier::Pass, Mechanism::Redirect(value.to_string())))
    } else {
        Some(Term::unknown(token))
    }
}

fn required(arg: Option<&str>) -> Option<String> {
    arg.map(strip_cidr).filter(|d| !d.is_empty()).map(str::to_string)
}

/// `None` when no argument, `Err` when an argument is present but empty
fn optional_domain(arg: Option<&str>) -> Result<Option<String>, ()> {
    match arg {
        None => Ok(None),
        Some(raw) => match strip_cidr(raw) {
            "" => Err(()),
            domain => Ok(Some(domain.to_string())),
        },
    }
}

/// Drop a `/cidr4` or `//cidr6` suffix from a domain-spec
fn strip_cidr(arg: &str) -> &str {
    arg.split('/').next().unwrap_or(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mechanisms(record: &str) -> Vec<Mechanism> {
        parse_record(record).into_iter().map(|t| t.mechanism).collect()
    }

    #[test]
    fn test_parse_spf_record() {
        let terms = parse_record("v=spf1 ip4:192.168.1.0/24 include:_spf.google.com -all");

        assert_eq!(
            terms,
            vec![
                Term::new(Qualifier::Pass, Mechanism::Ip4("192.168.1.0/24".into())),
                Term::new(Qualifier::Pass, Mechanism::Include("_spf.google.com".into())),
                Term::new(Qualifier::Fail, Mechanism::All),
            ]
        );
    }

    #[test]
    fn test_version_term_not_emitted() {
        assert!(parse_record("v=spf1").is_empty());
        assert!(parse_record("V=SPF1   ").is_empty());
    }

    #[test]
    fn test_qualifiers() {
        let qualifiers: Vec<Qualifier> = parse_record("v=spf1 +all -all ~all ?all all")
            .into_iter()
            .map(|t| t.qualifier)
            .collect();
        assert_eq!(
            qualifiers,
            vec![
                Qualifier::Pass,
                Qualifier::Fail,
                Qualifier::SoftFail,
                Qualifier::Neutral,
                Qualifier::Pass,
            ]
        );
        assert_eq!(Qualifier::SoftFail.all_term(), "~all");
    }

    #[test]
    fn test_a_and_mx_forms() {
        assert_eq!(
            mechanisms("v=spf1 a mx a:mail.example.com mx:example.org/24 a/24 mx//64 a:host.example.com/24//64"),
            vec![
                Mechanism::A(None),
                Mechanism::Mx(None),
                Mechanism::A(Some("mail.example.com".into())),
                Mechanism::Mx(Some("example.org".into())),
                Mechanism::A(None),
                Mechanism::Mx(None),
                Mechanism::A(Some("host.example.com".into())),
            ]
        );
    }

    #[test]
    fn test_names_case_insensitive() {
        assert_eq!(
            mechanisms("v=spf1 INCLUDE:Example.com IP4:10.0.0.1 MX -ALL"),
            vec![
                Mechanism::Include("Example.com".into()),
                Mechanism::Ip4("10.0.0.1".into()),
                Mechanism::Mx(None),
                Mechanism::All,
            ]
        );
    }

    #[test]
    fn test_unrecognized_terms_do_not_abort() {
        assert_eq!(
            mechanisms("v=spf1 foo:bar ip4:1.2.3.4 exp=explain.example.com include: allx ?all"),
            vec![
                Mechanism::Unknown("foo:bar".into()),
                Mechanism::Ip4("1.2.3.4".into()),
                Mechanism::Unknown("exp=explain.example.com".into()),
                Mechanism::Unknown("include:".into()),
                Mechanism::Unknown("allx".into()),
                Mechanism::All,
            ]
        );
    }

    #[test]
    fn test_redirect_exists_ptr() {
        assert_eq!(
            mechanisms("v=spf1 exists:%{i}.spf.example.com ptr ptr:example.net redirect=_spf.example.com"),
            vec![
                Mechanism::Exists("%{i}.spf.example.com".into()),
                Mechanism::Ptr(None),
                Mechanism::Ptr(Some("example.net".into())),
                Mechanism::Redirect("_spf.example.com".into()),
            ]
        );
    }

    #[test]
    fn test_lookup_cost() {
        let cost: u32 = parse_record(
            "v=spf1 ip4:1.2.3.4 ip6:2001:db8::/32 a mx include:x.example exists:y.example ptr redirect=z.example unknown -all",
        )
        .iter()
        .map(|t| t.mechanism.lookup_cost())
        .sum();
        assert_eq!(cost, 6);
    }

    #[test]
    fn test_redirect_ignored_when_all_present() {
        let with_all = parse_record("v=spf1 mx -all redirect=other.example");
        assert!(!redirect_applies(&with_all));
        assert_eq!(record_lookup_cost(&with_all), 1);

        let without_all = parse_record("v=spf1 mx redirect=other.example");
        assert!(redirect_applies(&without_all));
        assert_eq!(record_lookup_cost(&without_all), 2);
    }

    #[test]
    fn test_ip6_literal_keeps_colons() {
        assert_eq!(
            mechanisms("v=spf1 ip6:2001:db8::/32 ip6:::1"),
            vec![
                Mechanism::Ip6("2001:db8::/32".into()),
                Mechanism::Ip6("::1".into()),
            ]
        );
    }

    #[test]
    fn test_is_spf_record() {
        assert!(is_spf_record("v=spf1 -all"));
        assert!(is_spf_record("v=spf1"));
        assert!(is_spf_record("V=SPF1 mx"));
        assert!(!is_spf_record("v=spf10 -all"));
        assert!(!is_spf_record("google-site-verification=abc"));
        assert!(!is_spf_record(""));
    }

    #[test]
    fn test_display_round_trips_term_text() {
        let record = "v=spf1 a:mail.example.com include:x.example redirect=y.example";
        let rendered: Vec<String> = parse_record(record)
            .iter()
            .map(|t| t.mechanism.to_string())
            .collect();
        assert_eq!(
            rendered,
            vec!["a:mail.example.com", "include:x.example", "redirect=y.example"]
        );
    }
}
