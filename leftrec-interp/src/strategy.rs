//! How the interpreter reacts to input that doesn't match.

use leftrec_grammar::{EOF, TokenType};
use log::debug;

use crate::error::{ParseError, RecognitionError};
use crate::token_stream::TokenStream;

/// Outcome of a failed match that the strategy handled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InlineRecovery {
    /// The current token is extra and is to be consumed before the expected one.
    Deleted,
    Mismatch(RecognitionError),
}

pub trait ErrorStrategy {
    fn reset(&mut self);

    fn report_error(&mut self, error: &RecognitionError);

    /// A token matched, so any error condition is over.
    fn report_match(&mut self);

    fn in_error_recovery_mode(&self) -> bool;

    fn recover_inline(
        &mut self,
        input: &TokenStream,
        expected: TokenType,
    ) -> Result<InlineRecovery, ParseError>;

    /// Called after `error` left the current rule. Returns whether the interpreter should
    /// consume the current token.
    fn recover(&mut self, input: &TokenStream, error: &RecognitionError) -> Result<bool, ParseError>;

    /// Called before each prediction.
    fn sync(&mut self, input: &TokenStream) -> Result<(), ParseError>;

    /// The first token at which the strategy saw an error, for strategies that keep it.
    fn first_error_token_index(&self) -> Option<usize> {
        None
    }
}

/// Reports errors, deletes single extra tokens and otherwise skips one token, never EOF.
#[derive(Clone, Debug, Default)]
pub struct DefaultErrorStrategy {
    error_recovery_mode: bool,
    errors_reported: usize,
}

impl DefaultErrorStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors_reported(&self) -> usize {
        self.errors_reported
    }

    fn begin_error_condition(&mut self) {
        self.error_recovery_mode = true;
    }
}

impl ErrorStrategy for DefaultErrorStrategy {
    fn reset(&mut self) {
        self.error_recovery_mode = false;
    }

    fn report_error(&mut self, error: &RecognitionError) {
        if self.error_recovery_mode {
            return;
        }
        self.begin_error_condition();
        self.errors_reported += 1;
        debug!("syntax error: {}", error);
    }

    fn report_match(&mut self) {
        self.error_recovery_mode = false;
    }

    fn in_error_recovery_mode(&self) -> bool {
        self.error_recovery_mode
    }

    fn recover_inline(
        &mut self,
        input: &TokenStream,
        expected: TokenType,
    ) -> Result<InlineRecovery, ParseError> {
        if input.la(2) == expected {
            debug!("extraneous input at token {}", input.index());
            self.begin_error_condition();
            self.errors_reported += 1;
            return Ok(InlineRecovery::Deleted);
        }
        Ok(InlineRecovery::Mismatch(RecognitionError::InputMismatch {
            token_index: input.index(),
            expected,
        }))
    }

    fn recover(&mut self, input: &TokenStream, _error: &RecognitionError) -> Result<bool, ParseError> {
        Ok(input.la(1) != EOF)
    }

    fn sync(&mut self, _input: &TokenStream) -> Result<(), ParseError> {
        Ok(())
    }
}

/// Cancels the parse at the first error.
#[derive(Clone, Debug, Default)]
pub struct BailErrorStrategy {
    inner: DefaultErrorStrategy,
}

impl BailErrorStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorStrategy for BailErrorStrategy {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn report_error(&mut self, error: &RecognitionError) {
        self.inner.report_error(error);
    }

    fn report_match(&mut self) {
        self.inner.report_match();
    }

    fn in_error_recovery_mode(&self) -> bool {
        self.inner.in_error_recovery_mode()
    }

    fn recover_inline(
        &mut self,
        input: &TokenStream,
        expected: TokenType,
    ) -> Result<InlineRecovery, ParseError> {
        Err(ParseError::Cancelled(RecognitionError::InputMismatch {
            token_index: input.index(),
            expected,
        }))
    }

    fn recover(&mut self, _input: &TokenStream, error: &RecognitionError) -> Result<bool, ParseError> {
        Err(ParseError::Cancelled(error.clone()))
    }

    fn sync(&mut self, _input: &TokenStream) -> Result<(), ParseError> {
        Ok(())
    }
}

/// Gives up on each error but consumes the offending token, so that it shows up in the tree
/// as an error node. Remembers where the first error happened.
#[derive(Clone, Debug, Default)]
pub struct BailButConsumeErrorStrategy {
    inner: DefaultErrorStrategy,
    first_error_token_index: Option<usize>,
}

impl BailButConsumeErrorStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn latch(&mut self, index: usize) {
        if self.first_error_token_index.is_none() {
            self.first_error_token_index = Some(index);
        }
    }
}

impl ErrorStrategy for BailButConsumeErrorStrategy {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn report_error(&mut self, error: &RecognitionError) {
        self.inner.report_error(error);
    }

    fn report_match(&mut self) {
        self.inner.report_match();
    }

    fn in_error_recovery_mode(&self) -> bool {
        self.inner.in_error_recovery_mode()
    }

    fn recover_inline(
        &mut self,
        input: &TokenStream,
        expected: TokenType,
    ) -> Result<InlineRecovery, ParseError> {
        self.latch(input.index());
        Ok(InlineRecovery::Mismatch(RecognitionError::InputMismatch {
            token_index: input.index(),
            expected,
        }))
    }

    fn recover(&mut self, input: &TokenStream, _error: &RecognitionError) -> Result<bool, ParseError> {
        self.latch(input.index());
        // EOF stays.
        Ok(input.index() + 1 < input.size())
    }

    fn sync(&mut self, _input: &TokenStream) -> Result<(), ParseError> {
        Ok(())
    }

    fn first_error_token_index(&self) -> Option<usize> {
        self.first_error_token_index
    }
}
