//! Short human-legible codes for tickets and orders
//!
//! A code is `<PREFIX>-<NNNN>` with the number drawn uniformly from
//! `[1000, 9999]`. Codes are not unique by construction; the store's
//! uniqueness constraint is the arbiter and [`CodeAllocator`] retries a
//! bounded number of times on collision.

use observability::TicketingMetrics;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::error::{Result, TicketingError};
use crate::store::StoreResult;

/// Lowest code number
pub const CODE_MIN: u16 = 1000;
/// Highest code number
pub const CODE_MAX: u16 = 9999;
/// Default number of attempts per allocation
pub const DEFAULT_CODE_ATTEMPTS: u32 = 5;

/// Format a code from its parts
pub fn format_code(prefix: &str, number: u16) -> String {
    format!("{}-{}", prefix.to_uppercase(), number)
}

/// Draw a fresh random code
pub fn generate_code(prefix: &str) -> String {
    let number = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX);
    format_code(prefix, number)
}

/// Source of candidate codes
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, prefix: &str) -> String;
}

/// Uniform random codes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, prefix: &str) -> String {
        generate_code(prefix)
    }
}

/// Replays a fixed list of numbers, repeating the last one when exhausted
#[derive(Debug)]
pub struct SequenceCodeGenerator {
    numbers: Mutex<VecDeque<u16>>,
    last: Mutex<u16>,
}

impl SequenceCodeGenerator {
    pub fn new(numbers: impl IntoIterator<Item = u16>) -> Self {
        Self {
            numbers: Mutex::new(numbers.into_iter().collect()),
            last: Mutex::new(CODE_MIN),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self, prefix: &str) -> String {
        let mut last = self.last.lock();
        if let Some(next) = self.numbers.lock().pop_front() {
            *last = next;
        }
        format_code(prefix, *last)
    }
}

/// What a code is being allocated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Ticket,
    Order,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::Ticket => "ticket",
            CodeKind::Order => "order",
        }
    }

    fn with_article(&self) -> &'static str {
        match self {
            CodeKind::Ticket => "a ticket",
            CodeKind::Order => "an order",
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded retry wrapper used at every code allocation site
///
/// Ticket and order prefixes are distinct, so a code alone tells which
/// namespace it belongs to.
#[derive(Clone)]
pub struct CodeAllocator {
    generator: Arc<dyn CodeGenerator>,
    ticket_prefix: String,
    order_prefix: String,
    max_attempts: u32,
}

impl CodeAllocator {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        ticket_prefix: &str,
        order_prefix: &str,
        max_attempts: u32,
    ) -> Self {
        Self {
            generator,
            ticket_prefix: ticket_prefix.to_uppercase(),
            order_prefix: order_prefix.to_uppercase(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn prefix(&self, kind: CodeKind) -> &str {
        match kind {
            CodeKind::Ticket => &self.ticket_prefix,
            CodeKind::Order => &self.order_prefix,
        }
    }

    /// Classify a code by its prefix
    pub fn kind_of(&self, code: &str) -> Option<CodeKind> {
        let (prefix, number) = code.trim().split_once('-')?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if prefix.eq_ignore_ascii_case(&self.ticket_prefix) {
            Some(CodeKind::Ticket)
        } else if prefix.eq_ignore_ascii_case(&self.order_prefix) {
            Some(CodeKind::Order)
        } else {
            None
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `attempt` with fresh codes until it stops reporting a duplicate
    ///
    /// Any other store failure ends the loop immediately. Running out of
    /// attempts yields `ResourceExhausted`.
    pub async fn allocate<T, F, Fut>(&self, kind: CodeKind, mut attempt: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let prefix = self.prefix(kind);

        for attempt_no in 1..=self.max_attempts {
            let code = self.generator.generate(prefix);
            match attempt(code.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_duplicate() => {
                    warn!(kind = kind.as_str(), code = %code, attempt = attempt_no, "code collision");
                    TicketingMetrics::code_collision(kind.as_str());
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(kind = kind.as_str(), attempts = self.max_attempts, "code allocation exhausted");
        TicketingMetrics::code_exhausted(kind.as_str());
        Err(TicketingError::ResourceExhausted(format!(
            "could not allocate {} code",
            kind.with_article()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    fn allocator(numbers: Vec<u16>) -> CodeAllocator {
        CodeAllocator::new(
            Arc::new(SequenceCodeGenerator::new(numbers)),
            "T",
            "O",
            DEFAULT_CODE_ATTEMPTS,
        )
    }

    fn taken(codes: &[&str]) -> HashSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..200 {
            let code = generate_code("t");
            let (prefix, number) = code.split_once('-').unwrap();
            assert_eq!(prefix, "T");
            let n: u16 = number.parse().unwrap();
            assert!((CODE_MIN..=CODE_MAX).contains(&n));
        }
    }

    #[test]
    fn test_kind_of() {
        let alloc = allocator(vec![]);
        assert_eq!(alloc.kind_of("T-4821"), Some(CodeKind::Ticket));
        assert_eq!(alloc.kind_of("o-4821"), Some(CodeKind::Order));
        assert_eq!(alloc.kind_of("X-4821"), None);
        assert_eq!(alloc.kind_of("T-48a1"), None);
        assert_eq!(alloc.kind_of("4821"), None);
    }

    #[tokio::test]
    async fn test_five_collisions_exhaust() {
        let alloc = allocator(vec![1111, 2222, 3333, 4444, 5555, 6666]);
        let used = taken(&["O-1111", "O-2222", "O-3333", "O-4444", "O-5555"]);
        let mut tried = Vec::new();

        let result = alloc
            .allocate(CodeKind::Order, |code| {
                tried.push(code.clone());
                let clash = used.contains(&code);
                async move {
                    if clash {
                        Err(StoreError::Duplicate { field: "order_code", value: code })
                    } else {
                        Ok(code)
                    }
                }
            })
            .await;

        assert_matches!(result, Err(TicketingError::ResourceExhausted(msg)) if msg.contains("order"));
        assert_eq!(tried.len(), 5);
    }

    #[tokio::test]
    async fn test_fifth_candidate_succeeds() {
        let alloc = allocator(vec![1111, 2222, 3333, 4444, 5555]);
        let used = taken(&["T-1111", "T-2222", "T-3333", "T-4444"]);

        let code = alloc
            .allocate(CodeKind::Ticket, |code| {
                let clash = used.contains(&code);
                async move {
                    if clash {
                        Err(StoreError::Duplicate { field: "ticket_code", value: code })
                    } else {
                        Ok(code)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(code, "T-5555");
    }

    #[tokio::test]
    async fn test_other_store_errors_stop_immediately() {
        let alloc = allocator(vec![]);
        let mut calls = 0;

        let result: Result<()> = alloc
            .allocate(CodeKind::Order, |_| {
                calls += 1;
                async { Err(StoreError::Connection("refused".into())) }
            })
            .await;

        assert_matches!(result, Err(TicketingError::Internal(_)));
        assert_eq!(calls, 1);
    }
}
