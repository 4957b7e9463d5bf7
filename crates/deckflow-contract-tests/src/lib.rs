//! Frozen JSON contract checks for the deckflow backend wire format.
//!
//! The crate carries no runtime code. Its `tests/` directory validates the
//! fixtures under `contracts/fixtures/` and the serialized request types of
//! `deckflow-contract` against the draft-07 schemas under `contracts/`.
