//! Curated alias tables for header matching.
//!
//! Aliases are stored in normalized form (upper-case alphanumerics only), the
//! same form [`normalize_header`](crate::utils::normalize_header) produces.

use sdtm_model::{Domain, MatchKind};

/// Identifier and timing aliases shared by every domain. `--` stands for the domain prefix.
const GENERIC_ALIASES: &[(&str, &[&str])] = &[
    (
        "STUDYID",
        &[
            "STUDY",
            "STUDYIDENTIFIER",
            "STUDYNUMBER",
            "STUDYCODE",
            "PROTOCOL",
            "PROTOCOLID",
            "PROTOCOLNUMBER",
        ],
    ),
    (
        "USUBJID",
        &[
            "SUBJECT",
            "SUBJECTID",
            "SUBJECTIDENTIFIER",
            "SUBJECTNUMBER",
            "SUBJNO",
            "UNIQUESUBJECTID",
            "UNIQUESUBJECTIDENTIFIER",
            "PATIENT",
            "PATIENTID",
            "PATID",
            "PARTICIPANTID",
        ],
    ),
    (
        "SITEID",
        &["SITE", "SITENUMBER", "SITENO", "SITECODE", "CENTER", "CENTRE", "CENTERID"],
    ),
    ("VISIT", &["VISITNAME", "VISITLABEL"]),
    ("VISITNUM", &["VISITNUMBER", "VISITNO", "VISITSEQ"]),
    ("EPOCH", &["STUDYPERIOD", "PERIOD"]),
    (
        "--DTC",
        &[
            "DATE",
            "DATETIME",
            "COLLECTIONDATE",
            "ASSESSMENTDATE",
            "VISITDATE",
            "DATEOFCOLLECTION",
        ],
    ),
    (
        "--STDTC",
        &[
            "STARTDATE",
            "STARTDATETIME",
            "STARTDT",
            "STDT",
            "ONSETDATE",
            "DATEOFONSET",
        ],
    ),
    (
        "--ENDTC",
        &[
            "ENDDATE",
            "ENDDATETIME",
            "ENDDT",
            "STOPDATE",
            "STOPDT",
            "RESOLUTIONDATE",
        ],
    ),
];

/// Natural-language synonyms keyed by variable suffix (`AESEV` -> `SEV`).
const SUFFIX_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "TERM",
        &[
            "VERBATIM",
            "VERBATIMTERM",
            "REPORTEDTERM",
            "EVENTTERM",
            "ADVERSEEVENT",
            "DIAGNOSIS",
            "CONDITION",
        ],
    ),
    (
        "DECOD",
        &[
            "DECODE",
            "PREFERREDTERM",
            "PT",
            "DICTIONARYTERM",
            "CODEDTERM",
            "STANDARDIZEDTERM",
        ],
    ),
    ("BODSYS", &["BODYSYSTEM", "SOC", "SYSTEMORGANCLASS"]),
    ("SEV", &["SEVERITY", "INTENSITY"]),
    ("SER", &["SERIOUS", "SERIOUSEVENT", "ISSERIOUS"]),
    ("REL", &["RELATIONSHIP", "RELATEDNESS", "CAUSALITY", "RELATED"]),
    ("OUT", &["OUTCOME"]),
    ("ACN", &["ACTIONTAKEN", "ACTION"]),
    ("SEQ", &["SEQUENCE", "SEQUENCENUMBER"]),
    (
        "TESTCD",
        &["TESTCODE", "TESTSHORTNAME", "PARAMCD", "PARAMETERCODE"],
    ),
    ("TEST", &["TESTNAME", "PARAMETER", "PARAM", "PARAMETERNAME"]),
    (
        "ORRES",
        &["RESULT", "VALUE", "RESULTVALUE", "ORIGINALRESULT", "MEASUREMENT"],
    ),
    ("ORRESU", &["UNIT", "UNITS", "RESULTUNIT", "ORIGINALUNIT"]),
    ("ORNRLO", &["LOWERLIMIT", "NORMALLOW", "LOWNORMAL", "REFRANGELOW"]),
    ("ORNRHI", &["UPPERLIMIT", "NORMALHIGH", "HIGHNORMAL", "REFRANGEHIGH"]),
    (
        "NRIND",
        &["REFERENCERANGEINDICATOR", "NORMALINDICATOR", "ABNORMALFLAG"],
    ),
    ("STAT", &["STATUS", "COMPLETIONSTATUS"]),
    ("REASND", &["REASONNOTDONE", "REASONNOTPERFORMED"]),
    ("POS", &["POSITION", "BODYPOSITION"]),
    ("LOC", &["LOCATION", "BODYLOCATION"]),
    ("SPEC", &["SPECIMEN", "SPECIMENTYPE", "SAMPLETYPE"]),
    ("CAT", &["CATEGORY"]),
    (
        "TRT",
        &[
            "TREATMENT",
            "TREATMENTNAME",
            "DRUG",
            "DRUGNAME",
            "MEDICATION",
            "MEDICATIONNAME",
            "STUDYDRUG",
        ],
    ),
    ("DOSE", &["DOSAGE", "DOSEAMOUNT"]),
    ("DOSU", &["DOSEUNIT", "DOSEUNITS"]),
    ("DOSFRQ", &["FREQUENCY", "DOSEFREQUENCY", "DOSINGFREQUENCY"]),
    ("ROUTE", &["ROUTEOFADMINISTRATION"]),
    ("INDC", &["INDICATION", "REASONFORUSE"]),
    ("PRESP", &["PRESPECIFIED"]),
    ("OCCUR", &["OCCURRENCE", "OCCURRED"]),
];

/// Synonyms for unprefixed, category-specific variables (mostly DM).
const VARIABLE_SYNONYMS: &[(&str, &[&str])] = &[
    ("SUBJID", &["SUBJECTIDFORSTUDY", "SCREENINGNUMBER"]),
    ("SEX", &["GENDER"]),
    ("AGE", &["AGEYEARS", "AGEATCONSENT"]),
    ("AGEU", &["AGEUNIT", "AGEUNITS"]),
    ("ETHNIC", &["ETHNICITY", "ETHNICGROUP"]),
    ("BRTHDTC", &["BIRTHDATE", "DATEOFBIRTH", "DOB", "BRTHDAT"]),
    (
        "RFSTDTC",
        &["REFERENCESTARTDATE", "FIRSTDOSEDATE", "RFSTDT", "FIRSTDOSE"],
    ),
    ("RFENDTC", &["REFERENCEENDDATE", "LASTDOSEDATE", "RFENDT"]),
    (
        "RFICDTC",
        &["CONSENTDATE", "INFORMEDCONSENTDATE", "ICDATE", "DATEOFCONSENT"],
    ),
    ("ARMCD", &["ARMCODE"]),
    ("ARM", &["ARMNAME", "TREATMENTARM", "PLANNEDARM"]),
];

/// An alias hit: the matched variable and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMatch {
    pub variable: String,
    pub kind: MatchKind,
}

/// Resolve a `--` pattern against the domain's variables.
fn resolve_pattern<'a>(domain: &'a Domain, pattern: &str) -> Option<&'a str> {
    domain.column_name(pattern)
}

/// Category-specific alias hits for a normalized header.
///
/// The domain prefix on the header is optional: `SEVERITY` and `AESEVERITY`
/// both resolve to `AESEV`.
pub fn suffix_matches(domain: &Domain, normalized: &str) -> Vec<AliasMatch> {
    let stripped = normalized
        .strip_prefix(domain.code.as_str())
        .filter(|rest| !rest.is_empty());
    let mut hits = Vec::new();
    for variable in &domain.variables {
        let name = variable.name.to_uppercase();
        let mut synonyms: Vec<&str> = Vec::new();
        let suffix = domain.variable_suffix(&name);
        if let Some(suffix) = suffix {
            synonyms.push(suffix);
            if let Some((_, list)) = SUFFIX_SYNONYMS.iter().find(|(key, _)| *key == suffix) {
                synonyms.extend(list.iter().copied());
            }
        } else if let Some((_, list)) = VARIABLE_SYNONYMS.iter().find(|(key, _)| *key == name) {
            synonyms.extend(list.iter().copied());
        }
        let matched = synonyms
            .iter()
            .any(|syn| *syn == normalized || stripped.is_some_and(|rest| rest == *syn));
        if matched && normalized != name {
            hits.push(AliasMatch {
                variable: variable.name.clone(),
                kind: MatchKind::Suffix,
            });
        }
    }
    hits
}

/// Generic identifier/timing alias hit for a normalized header.
pub fn generic_match(domain: &Domain, normalized: &str) -> Option<AliasMatch> {
    GENERIC_ALIASES.iter().find_map(|(pattern, aliases)| {
        if !aliases.contains(&normalized) {
            return None;
        }
        resolve_pattern(domain, pattern).map(|name| AliasMatch {
            variable: name.to_string(),
            kind: MatchKind::Generic,
        })
    })
}

/// Natural-language synonyms for a variable, used as extra fuzzy targets.
pub fn variable_synonyms(domain: &Domain, variable_name: &str) -> Vec<&'static str> {
    let name = variable_name.to_uppercase();
    let mut synonyms = Vec::new();
    match domain.variable_suffix(&name) {
        Some(suffix) => {
            if let Some((_, list)) = SUFFIX_SYNONYMS.iter().find(|(key, _)| *key == suffix) {
                synonyms.extend(list.iter().copied());
            }
        }
        None => {
            if let Some((_, list)) = VARIABLE_SYNONYMS.iter().find(|(key, _)| *key == name) {
                synonyms.extend(list.iter().copied());
            }
        }
    }
    for (pattern, aliases) in GENERIC_ALIASES {
        if resolve_pattern(domain, pattern).is_some_and(|resolved| resolved == name) {
            synonyms.extend(aliases.iter().copied());
        }
    }
    synonyms
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdtm_model::{Variable, VariableType};

    fn ae() -> Domain {
        Domain::new(
            "AE",
            vec![
                Variable::new("USUBJID", VariableType::Char),
                Variable::new("AETERM", VariableType::Char),
                Variable::new("AESEV", VariableType::Char),
                Variable::new("AESTDTC", VariableType::Char),
            ],
        )
    }

    #[test]
    fn suffix_alias_with_optional_prefix() {
        let domain = ae();
        for header in ["SEVERITY", "AESEVERITY", "SEV"] {
            let hits = suffix_matches(&domain, header);
            assert_eq!(hits.len(), 1, "{header}");
            assert_eq!(hits[0].variable, "AESEV");
        }
        assert!(suffix_matches(&domain, "AESEV").is_empty());
    }

    #[test]
    fn generic_alias_resolves_domain_pattern() {
        let domain = ae();
        assert_eq!(
            generic_match(&domain, "STARTDATE").map(|m| m.variable),
            Some("AESTDTC".to_string())
        );
        assert_eq!(
            generic_match(&domain, "SUBJECTID").map(|m| m.variable),
            Some("USUBJID".to_string())
        );
        assert!(generic_match(&domain, "ENDDATE").is_none());
    }
}
