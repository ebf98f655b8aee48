/// Fixed line geometry of an instrument export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportLayout {
    pub name: &'static str,
    /// Metadata lines above the column header.
    pub preamble_lines: usize,
    /// Units/separator rows between the column header and the first data row.
    pub formatting_rows: usize,
}

impl ExportLayout {
    /// Zero-based line index of the column header.
    pub const fn header_line_index(&self) -> usize {
        self.preamble_lines
    }

    /// Zero-based line index of the first data row.
    pub const fn data_start_line(&self) -> usize {
        self.preamble_lines + 1 + self.formatting_rows
    }

    /// Number of raw lines a continuation file contributes before its data.
    pub const fn header_skip(&self) -> usize {
        self.data_start_line()
    }
}

pub const OXYMAX_V1: ExportLayout = ExportLayout {
    name: "clams-oxymax-v1",
    preamble_lines: 22,
    formatting_rows: 2,
};

pub const SUBJECT_ID_MARKER: &str = "Subject ID";

/// Canonical CLAMS column names, spelled exactly as the instrument writes them.
pub mod columns {
    pub const INTERVAL: &str = "INTERVAL";
    pub const CHAN: &str = "CHAN";
    pub const DATE_TIME: &str = "DATE/TIME";
    pub const VO2: &str = "VO2";
    pub const VCO2: &str = "VCO2";
    pub const RER: &str = "RER";
    pub const HEAT: &str = "HEAT";
    pub const FLOW: &str = "FLOW";
    pub const PRESSURE: &str = "PRESSURE";
    pub const O2IN: &str = "O2IN";
    pub const ACCO2: &str = "ACCO2";
    pub const ACCCO2: &str = "ACCCO2";
    pub const FEED1: &str = "FEED1";
    pub const FEED1_ACC: &str = "FEED1 ACC";
    pub const WHEEL: &str = "WHEEL";
    pub const WHEEL_ACC: &str = "WHEEL ACC";
    pub const XAMB: &str = "XAMB";
    pub const YAMB: &str = "YAMB";
    pub const AMB: &str = "AMB";
    pub const AMB_ACC: &str = "AMB ACC";
    pub const LED_LIGHTNESS: &str = "LED LIGHTNESS";
    pub const ENCLOSURE_TEMP: &str = "ENCLOSURE TEMP";
    pub const ENCLOSURE_SETPOINT: &str = "ENCLOSURE SETPOINT";
}
