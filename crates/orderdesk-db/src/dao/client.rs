//! # Client DAO
//!
//! Clients need nothing beyond generic CRUD, so the DAO is the generic one.

use orderdesk_core::Client;

use super::Dao;

/// DAO for [`Client`].
pub type ClientDao = Dao<Client>;

// =============================================================================
// Unit Tests
// =============================================================================
