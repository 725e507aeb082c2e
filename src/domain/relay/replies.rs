//! Fixed replies sent when the engine produces no usable answer.

/// Reply sent in place of an engine answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReply {
    /// The engine finished without a final response.
    NoAnswer,
    /// The engine failed while producing events.
    EngineFailure,
}

impl FallbackReply {
    /// The exact text delivered to the client.
    pub fn text(self) -> &'static str {
        match self {
            FallbackReply::NoAnswer => {
                "I'm having trouble responding right now. Please try again in a moment."
            }
            FallbackReply::EngineFailure => "Sorry, something went wrong. Please try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_are_distinct_and_non_blank() {
        let no_answer = FallbackReply::NoAnswer.text();
        let failure = FallbackReply::EngineFailure.text();
        assert_ne!(no_answer, failure);
        assert!(!no_answer.trim().is_empty());
        assert!(!failure.trim().is_empty());
    }
}
