//! Boolean visibility-label evaluation.
//!
//! A label is a boolean expression over literal authorization tokens,
//! combined with `&` and `|` and grouped with parentheses; AND binds tighter
//! than OR. The empty label is visible to everyone. A label the grammar
//! rejects is a fatal configuration error surfaced to the caller, never a
//! silent always-true or always-false.

use crate::error::CelldbError;
use crate::security::Authorizations;
use lru::LruCache;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

const PARSE_CACHE_SHARDS: usize = 16;
const PARSE_CACHE_TOTAL_CAPACITY: usize = 256;
const PARSE_CACHE_PER_SHARD: usize = PARSE_CACHE_TOTAL_CAPACITY / PARSE_CACHE_SHARDS;

/// Cache of parsed label expressions keyed by the raw label bytes. Parsing
/// is deterministic, so a cached tree is always valid for its label.
type ParseCacheShard = parking_lot::Mutex<LruCache<Vec<u8>, Arc<VisibilityExpr>>>;
type ParseCache = [ParseCacheShard; PARSE_CACHE_SHARDS];

static PARSE_CACHE: once_cell::sync::Lazy<ParseCache> = once_cell::sync::Lazy::new(|| {
    std::array::from_fn(|_| {
        let cap = NonZeroUsize::new(PARSE_CACHE_PER_SHARD).unwrap_or(NonZeroUsize::MIN);
        parking_lot::Mutex::new(LruCache::new(cap))
    })
});

fn cache_shard_idx(label: &[u8]) -> usize {
    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    (hasher.finish() as usize) % PARSE_CACHE_SHARDS
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityExpr {
    /// Empty label: visible under any authorization set.
    Empty,
    Token(String),
    And(Vec<VisibilityExpr>),
    Or(Vec<VisibilityExpr>),
}

impl VisibilityExpr {
    /// Parses a label, consulting the shared parse cache first.
    pub fn parse(label: &[u8]) -> Result<Arc<VisibilityExpr>, CelldbError> {
        if label.is_empty() {
            return Ok(Arc::new(VisibilityExpr::Empty));
        }
        let shard = &PARSE_CACHE[cache_shard_idx(label)];
        if let Some(expr) = shard.lock().get(label) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(parse_uncached(label)?);
        shard.lock().put(label.to_vec(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Substitutes each literal token with membership in `auths` and reduces
    /// with short-circuit boolean evaluation.
    pub fn evaluate(&self, auths: &Authorizations) -> bool {
        match self {
            VisibilityExpr::Empty => true,
            VisibilityExpr::Token(token) => auths.contains(token),
            VisibilityExpr::And(terms) => terms.iter().all(|t| t.evaluate(auths)),
            VisibilityExpr::Or(terms) => terms.iter().any(|t| t.evaluate(auths)),
        }
    }
}

/// Parses and evaluates a label in one call.
pub fn is_visible(label: &[u8], auths: &Authorizations) -> Result<bool, CelldbError> {
    Ok(VisibilityExpr::parse(label)?.evaluate(auths))
}

fn malformed(label: &[u8], detail: &str) -> CelldbError {
    CelldbError::SecurityDenied(format!(
        "malformed visibility expression '{}': {detail}",
        String::from_utf8_lossy(label)
    ))
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':' | b'/')
}

struct Parser<'a> {
    label: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.label.get(self.pos).copied()
    }

    // expr := term ('|' term)*
    fn parse_expr(&mut self) -> Result<VisibilityExpr, CelldbError> {
        let mut terms = vec![self.parse_term()?];
        while self.peek() == Some(b'|') {
            self.pos += 1;
            terms.push(self.parse_term()?);
        }
        Ok(if terms.len() == 1 {
            terms.swap_remove(0)
        } else {
            VisibilityExpr::Or(terms)
        })
    }

    // term := factor ('&' factor)*
    fn parse_term(&mut self) -> Result<VisibilityExpr, CelldbError> {
        let mut factors = vec![self.parse_factor()?];
        while self.peek() == Some(b'&') {
            self.pos += 1;
            factors.push(self.parse_factor()?);
        }
        Ok(if factors.len() == 1 {
            factors.swap_remove(0)
        } else {
            VisibilityExpr::And(factors)
        })
    }

    // factor := TOKEN | '(' expr ')'
    fn parse_factor(&mut self) -> Result<VisibilityExpr, CelldbError> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                if self.peek() != Some(b')') {
                    return Err(malformed(self.label, "unbalanced parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(b) if is_token_byte(b) => {
                let start = self.pos;
                while self.peek().is_some_and(is_token_byte) {
                    self.pos += 1;
                }
                let token = std::str::from_utf8(&self.label[start..self.pos])
                    .map_err(|_| malformed(self.label, "non-utf8 token"))?;
                Ok(VisibilityExpr::Token(token.to_string()))
            }
            Some(_) => Err(malformed(self.label, "expected token or '('")),
            None => Err(malformed(self.label, "expression ends unexpectedly")),
        }
    }
}

fn parse_uncached(label: &[u8]) -> Result<VisibilityExpr, CelldbError> {
    let mut parser = Parser { label, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != label.len() {
        return Err(malformed(label, "trailing input after expression"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::{VisibilityExpr, is_visible};
    use crate::security::Authorizations;

    fn auths(labels: &[&str]) -> Authorizations {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn and_requires_every_token() {
        assert!(is_visible(b"A&B", &auths(&["A", "B"])).unwrap());
        assert!(!is_visible(b"A&B", &auths(&["A"])).unwrap());
    }

    #[test]
    fn or_requires_any_token() {
        assert!(is_visible(b"A|B", &auths(&["A"])).unwrap());
        assert!(!is_visible(b"A|B", &auths(&["C"])).unwrap());
    }

    #[test]
    fn parentheses_override_precedence() {
        assert!(is_visible(b"(A&B)|C", &auths(&["C"])).unwrap());
        assert!(!is_visible(b"(A&B)|C", &auths(&["A"])).unwrap());
        // Without parentheses AND binds tighter than OR.
        assert!(is_visible(b"A&B|C", &auths(&["C"])).unwrap());
        assert!(is_visible(b"A&B|C", &auths(&["A", "B"])).unwrap());
        assert!(!is_visible(b"A&B|C", &auths(&["B"])).unwrap());
    }

    #[test]
    fn empty_label_is_always_visible() {
        assert!(is_visible(b"", &Authorizations::empty()).unwrap());
    }

    #[test]
    fn malformed_labels_are_errors_not_false() {
        for label in [&b"A&"[..], b"|A", b"(A", b"A)", b"A B", b"&", b"()"] {
            let err = is_visible(label, &auths(&["A", "B"])).unwrap_err();
            assert_eq!(err.code_str(), "security_denied", "label {label:?}");
        }
    }

    #[test]
    fn parse_is_cached_per_label() {
        let first = VisibilityExpr::parse(b"cached&label").unwrap();
        let second = VisibilityExpr::parse(b"cached&label").unwrap();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }
}
