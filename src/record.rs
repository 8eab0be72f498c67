//! The assembled inspection record a protocol is rendered from. All
//! measurement fields are free text echoed verbatim into the report;
//! the only derived value is the per-circuit pass/fail status.

/// Final assessment of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fit,
    Unfit,
}

impl Verdict {
    pub fn report_text(&self) -> &'static str {
        match self {
            Verdict::Fit => "INSTALACJA NADAJE SIĘ DO EKSPLOATACJI",
            Verdict::Unfit => "INSTALACJA NIE NADAJE SIĘ DO EKSPLOATACJI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSystem {
    TnCS,
    TnS,
    TnC,
    Tt,
    It,
}

impl NetworkSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkSystem::TnCS => "TN-C-S",
            NetworkSystem::TnS => "TN-S",
            NetworkSystem::TnC => "TN-C",
            NetworkSystem::Tt => "TT",
            NetworkSystem::It => "IT",
        }
    }
}

/// Result of a single visual inspection item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Positive,
    Negative,
    NotApplicable,
}

impl CheckOutcome {
    pub fn report_text(&self) -> &'static str {
        match self {
            CheckOutcome::Positive => "POZYTYWNY",
            CheckOutcome::Negative => "NEGATYWNY",
            CheckOutcome::NotApplicable => "N/D",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub client: String,
    pub site: String,
    pub test_date: String,
    pub protocol_no: String,
    pub inspector: String,
    pub license_no: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone)]
pub struct Instrument {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
}

/// Main equipotential bonding connections present at the installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BondingFlags {
    pub water: bool,
    pub gas: bool,
    pub structure: bool,
    pub heating: bool,
}

impl BondingFlags {
    /// Joined labels in canonical order, or the none-literal when no
    /// connection is present.
    pub fn summary(&self) -> String {
        let mut present = Vec::new();
        for (flag, label) in [
            (self.water, "Woda"),
            (self.gas, "Gaz"),
            (self.structure, "Konstr."),
            (self.heating, "C.O."),
        ] {
            if flag {
                present.push(label);
            }
        }
        if present.is_empty() {
            "Brak".to_string()
        } else {
            present.join(", ")
        }
    }
}

#[derive(Debug, Clone)]
pub struct Supply {
    pub network: NetworkSystem,
    pub voltage: String,
    pub frequency: String,
    pub earth_electrode: String,
    pub earth_resistance: String,
    pub source_impedance: String,
    pub prospective_fault_current: String,
    pub main_fuse_kind: String,
    pub main_fuse_rating: String,
    pub main_switch: String,
    pub pe_conductor: String,
    pub bonding: BondingFlags,
}

/// One measured circuit. Every field renders verbatim; `status` is the
/// single derived column.
#[derive(Debug, Clone)]
pub struct CircuitRow {
    pub circuit: String,
    pub conductor: String,
    pub cross_section: String,
    pub device_kind: String,
    pub device_rating: String,
    pub insulation_res: String,
    pub loop_measured: String,
    pub loop_permissible: String,
    pub rcd_trip_ms: String,
}

impl CircuitRow {
    pub fn status(&self) -> RowStatus {
        classify(&self.loop_measured, &self.loop_permissible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Pass,
    Fail,
}

impl RowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Pass => "PASS",
            RowStatus::Fail => "FAIL",
        }
    }
}

/// Boundary check on the fault-loop impedance. `Fail` only when both
/// values parse as finite numbers and the measured value exceeds the
/// permissible one. Non-numeric input deliberately passes: the text is
/// still echoed into the table for the inspector to judge.
pub fn classify(measured: &str, permissible: &str) -> RowStatus {
    let measured = measured.trim().replace(',', ".").parse::<f64>();
    let permissible = permissible.trim().replace(',', ".").parse::<f64>();
    match (measured, permissible) {
        (Ok(m), Ok(p)) if m.is_finite() && p.is_finite() && m > p => RowStatus::Fail,
        _ => RowStatus::Pass,
    }
}

/// Optional header-label overrides for the three configurable columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnLabels {
    pub circuit: Option<String>,
    pub insulation: Option<String>,
    pub loop_measured: Option<String>,
}

pub const DEFAULT_CIRCUIT_LABEL: &str = "Obwód / Opis";
pub const DEFAULT_INSULATION_LABEL: &str = "R_ISO";
pub const DEFAULT_LOOP_LABEL: &str = "Pętla (Zs)";

impl ColumnLabels {
    pub fn circuit_label(&self) -> &str {
        self.circuit.as_deref().unwrap_or(DEFAULT_CIRCUIT_LABEL)
    }

    pub fn insulation_label(&self) -> &str {
        self.insulation.as_deref().unwrap_or(DEFAULT_INSULATION_LABEL)
    }

    pub fn loop_label(&self) -> &str {
        self.loop_measured.as_deref().unwrap_or(DEFAULT_LOOP_LABEL)
    }
}

#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub meta: ReportMeta,
    pub instrument: Instrument,
    pub supply: Supply,
    pub inspection: Vec<(String, CheckOutcome)>,
    /// Named measurement tables, one section per entry. Must not be empty.
    pub tables: Vec<(String, Vec<CircuitRow>)>,
    pub column_labels: ColumnLabels,
    pub remarks: String,
}

/// The canonical visual-inspection checklist. The renderer itself never
/// assumes this count; assemblers use it to seed the fixed set.
pub fn default_inspection_items() -> Vec<&'static str> {
    vec![
        "Dobór przewodów do obciążalności i spadku napięcia",
        "Dobór i nastawienie urządzeń zabezpieczających",
        "Oznaczenia przewodów neutralnych i ochronnych",
        "Umieszczenie schematów i tablic ostrzegawczych",
        "Oznaczenia obwodów, bezpieczników, łączników",
        "Poprawność połączeń przewodów",
        "Dostęp do urządzeń dla wygodnej obsługi i konserwacji",
        "Stan ochrony przed dotykiem bezpośrednim",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_fails_only_when_measured_exceeds_permissible() {
        assert_eq!(classify("1.38", "1.44"), RowStatus::Pass);
        assert_eq!(classify("1.44", "1.44"), RowStatus::Pass);
        assert_eq!(classify("1.45", "1.44"), RowStatus::Fail);
    }

    #[test]
    fn classify_passes_non_numeric_input() {
        assert_eq!(classify("", "1.44"), RowStatus::Pass);
        assert_eq!(classify("b/d", "1.44"), RowStatus::Pass);
        assert_eq!(classify("1.45", ""), RowStatus::Pass);
        assert_eq!(classify("NaN", "1.44"), RowStatus::Pass);
    }

    #[test]
    fn classify_accepts_comma_decimals() {
        assert_eq!(classify("1,45", "1,44"), RowStatus::Fail);
        assert_eq!(classify("1,38", "1,44"), RowStatus::Pass);
    }

    #[test]
    fn bonding_summary_joins_in_canonical_order() {
        let all = BondingFlags {
            water: true,
            gas: true,
            structure: true,
            heating: true,
        };
        assert_eq!(all.summary(), "Woda, Gaz, Konstr., C.O.");
        let some = BondingFlags {
            water: true,
            heating: true,
            ..Default::default()
        };
        assert_eq!(some.summary(), "Woda, C.O.");
        assert_eq!(BondingFlags::default().summary(), "Brak");
    }

    #[test]
    fn column_labels_default_and_override() {
        let labels = ColumnLabels::default();
        assert_eq!(labels.circuit_label(), "Obwód / Opis");
        assert_eq!(labels.insulation_label(), "R_ISO");
        assert_eq!(labels.loop_label(), "Pętla (Zs)");
        let custom = ColumnLabels {
            insulation: Some("R_iso (MΩ)".to_string()),
            ..Default::default()
        };
        assert_eq!(custom.insulation_label(), "R_iso (MΩ)");
    }

    #[test]
    fn verdict_strings_are_fixed() {
        assert!(Verdict::Fit.report_text().contains("NADAJE"));
        assert!(Verdict::Unfit.report_text().contains("NIE NADAJE"));
    }

    #[test]
    fn default_checklist_has_eight_items() {
        assert_eq!(default_inspection_items().len(), 8);
    }
}
