use serde::{Deserialize, Serialize};

/// SUPPQUAL variables in standard order.
pub const SUPPQUAL_VARIABLES: [&str; 10] = [
    "STUDYID", "RDOMAIN", "USUBJID", "IDVAR", "IDVARVAL", "QNAM", "QLABEL", "QVAL", "QORIG",
    "QEVAL",
];

/// One supplemental qualifier record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppqualRecord {
    pub studyid: String,
    pub rdomain: String,
    pub usubjid: String,
    /// Identifier variable of the owning record (e.g. `AESEQ`); empty for DM.
    pub idvar: String,
    pub idvarval: String,
    pub qnam: String,
    pub qlabel: String,
    pub qval: String,
    pub qorig: String,
    pub qeval: String,
}

impl SuppqualRecord {
    /// Values in [`SUPPQUAL_VARIABLES`] order.
    pub fn values(&self) -> [&str; 10] {
        [
            self.studyid.as_str(),
            self.rdomain.as_str(),
            self.usubjid.as_str(),
            self.idvar.as_str(),
            self.idvarval.as_str(),
            self.qnam.as_str(),
            self.qlabel.as_str(),
            self.qval.as_str(),
            self.qorig.as_str(),
            self.qeval.as_str(),
        ]
    }
}
