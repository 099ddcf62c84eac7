//! Domain-specific processing rules.
//!
//! Each processor implements [`DomainProcessor`] and is registered in a
//! [`ProcessorRegistry`]. The pipeline dispatches by domain code; codes without
//! a registered processor get the no-op [`DefaultProcessor`].
//!
//! | Domain | Rules |
//! |--------|-------|
//! | DM | AGE numeric, AGEU default, SEX default `U`, COUNTRY upper-case, one row per subject |
//! | AE | AESEV default `MILD`, Y/N flags, AEDECOD backfill, date order warnings |
//! | CM | CMDECOD backfill |
//! | EX | EXENDTC defaults to EXSTDTC |
//! | MH | MHDECOD backfill, Y/N flags |
//! | DS | DSDECOD synonyms, DSCAT derivation, consent and disposition companion rows |
//! | VS | TESTCD/TEST pairing, NOT DONE status |
//! | LB | as VS, plus reference range indicator |
//!
//! Processors that own a sequence variable deduplicate on a natural key and
//! renumber after an explicit sort.

mod ae;
mod cm;
mod common;
mod dm;
mod ds;
mod ex;
mod findings;
mod lb;
mod mh;
mod processor_trait;
mod vs;

pub use ds::{COMPLETED, CONSENT, DISPOSITION_EVENT, PROTOCOL_MILESTONE};
pub use processor_trait::{DefaultProcessor, DomainProcessor, ProcessorRegistry, default_registry};
