//! Bidsync DB - PostgreSQL repositories for the legacy source and the
//! bidding-platform destination.

pub mod destination;
pub mod source;

pub use destination::DestinationRepository;
pub use source::SourceRepository;
