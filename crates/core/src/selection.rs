//! Selection and confirmation state machine.
//!
//! A batch only leaves this module through [`SelectionFlow::confirm`], so
//! nothing reaches the fetch queue without an explicit confirmation.

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::models::{CompositeKey, ListingItem};

/// Token that goes back to the filter prompt.
pub const CHANGE_FILTER_TOKEN: &str = "0";

const ALL_TOKENS: [&str; 3] = ["all", "a", "*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Filtering,
    Listing,
    Selecting,
    Confirming,
    Fetching,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Filtering => "filtering",
            FlowState::Listing => "listing",
            FlowState::Selecting => "selecting",
            FlowState::Confirming => "confirming",
            FlowState::Fetching => "fetching",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No models match the filter. Try another keyword or press Enter to show all models.")]
    NoMatches,

    #[error("Invalid input '{0}'. Enter numbers separated by commas.")]
    InvalidToken(String),

    #[error("Invalid selection {index}. Valid range is 1 to {max}.")]
    OutOfRange { index: usize, max: usize },

    #[error("Unrecognised answer '{0}'. Use y to confirm, r to reselect or f to change the filter.")]
    InvalidAnswer(String),

    #[error("cannot {action} while {state}")]
    WrongState { action: &'static str, state: FlowState },
}

/// Parsed answer at the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// Zero-based indices into the listing, deduplicated, in input order.
    Indices(Vec<usize>),
    All,
    ChangeFilter,
}

pub fn parse_selection(input: &str, len: usize) -> Result<SelectionCommand, SelectionError> {
    let input = input.trim();
    if input.is_empty() || input == CHANGE_FILTER_TOKEN {
        return Ok(SelectionCommand::ChangeFilter);
    }
    if ALL_TOKENS.iter().any(|t| input.eq_ignore_ascii_case(t)) {
        return Ok(SelectionCommand::All);
    }

    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    for token in input.split(',').map(str::trim) {
        let index: usize = token
            .parse()
            .map_err(|_| SelectionError::InvalidToken(token.to_string()))?;
        if index == 0 || index > len {
            return Err(SelectionError::OutOfRange { index, max: len });
        }
        if seen.insert(index) {
            indices.push(index - 1);
        }
    }

    Ok(SelectionCommand::Indices(indices))
}

/// Parsed answer at the confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmCommand {
    Confirm,
    Reselect,
    ChangeFilter,
}

pub fn parse_confirmation(input: &str) -> Result<ConfirmCommand, SelectionError> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Ok(ConfirmCommand::Confirm),
        "r" | "reselect" => Ok(ConfirmCommand::Reselect),
        "f" | "n" | "no" | CHANGE_FILTER_TOKEN => Ok(ConfirmCommand::ChangeFilter),
        other => Err(SelectionError::InvalidAnswer(other.to_string())),
    }
}

/// The keys of a confirmed batch, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedBatch(Vec<CompositeKey>);

impl ConfirmedBatch {
    pub fn keys(&self) -> &[CompositeKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for ConfirmedBatch {
    type Item = CompositeKey;
    type IntoIter = std::vec::IntoIter<CompositeKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug)]
pub struct SelectionFlow {
    state: FlowState,
    listing: Vec<ListingItem>,
    selected: Vec<ListingItem>,
}

impl Default for SelectionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Filtering,
            listing: Vec::new(),
            selected: Vec::new(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn listing(&self) -> &[ListingItem] {
        &self.listing
    }

    pub fn selected(&self) -> &[ListingItem] {
        &self.selected
    }

    fn expect(&self, state: FlowState, action: &'static str) -> Result<(), SelectionError> {
        if self.state == state {
            Ok(())
        } else {
            Err(SelectionError::WrongState {
                action,
                state: self.state,
            })
        }
    }

    /// Install a filtered listing. An empty listing keeps the flow in
    /// `Filtering` so the caller re-prompts.
    pub fn show(&mut self, listing: Vec<ListingItem>) -> Result<&[ListingItem], SelectionError> {
        self.expect(FlowState::Filtering, "show a listing")?;
        if listing.is_empty() {
            return Err(SelectionError::NoMatches);
        }
        self.listing = listing;
        self.state = FlowState::Listing;
        Ok(&self.listing)
    }

    /// The listing has been presented; start accepting selections.
    pub fn begin_selection(&mut self) -> Result<(), SelectionError> {
        self.expect(FlowState::Listing, "select")?;
        self.state = FlowState::Selecting;
        Ok(())
    }

    /// Apply a selection answer. Invalid input leaves the state untouched.
    pub fn select(&mut self, input: &str) -> Result<FlowState, SelectionError> {
        self.expect(FlowState::Selecting, "select")?;

        match parse_selection(input, self.listing.len())? {
            SelectionCommand::ChangeFilter => self.reset(),
            SelectionCommand::All => {
                self.selected = self.listing.clone();
                self.state = FlowState::Confirming;
            }
            SelectionCommand::Indices(indices) => {
                self.selected = indices.into_iter().map(|i| self.listing[i].clone()).collect();
                self.state = FlowState::Confirming;
            }
        }

        Ok(self.state)
    }

    /// Apply a confirmation answer. Only `Confirm` releases the batch.
    pub fn confirm(&mut self, input: &str) -> Result<Option<ConfirmedBatch>, SelectionError> {
        self.expect(FlowState::Confirming, "confirm")?;

        match parse_confirmation(input)? {
            ConfirmCommand::Confirm => {
                self.state = FlowState::Fetching;
                let keys = self.selected.iter().map(|item| item.key.clone()).collect();
                Ok(Some(ConfirmedBatch(keys)))
            }
            ConfirmCommand::Reselect => {
                self.selected.clear();
                self.state = FlowState::Selecting;
                Ok(None)
            }
            ConfirmCommand::ChangeFilter => {
                self.reset();
                Ok(None)
            }
        }
    }

    /// Back to `Filtering` after a batch or when the user abandons the listing.
    pub fn reset(&mut self) {
        self.listing.clear();
        self.selected.clear();
        self.state = FlowState::Filtering;
    }
}
