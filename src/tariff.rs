use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Providers known to publish in the shared price feed.
pub const KNOWN_PROVIDERS: [&str; 9] = [
    "Alfa Power Index BTN",
    "Coopérnico Base",
    "Coopérnico GO",
    "EDP Indexada Horária",
    "EZU Tarifa Coletiva",
    "G9 Smart Dynamic",
    "Galp Plano Dinâmico",
    "MeoEnergia Tarifa Variável",
    "Repsol Leve Sem Mais",
];

/// Tariff option (billing schedule).
///
/// Identified by a stable internal code, and by a display name in the feed's `opcao` column.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Tariff {
    #[serde(rename = "SIMPLE")]
    Simple,

    #[serde(rename = "BIHORARIO_DIARIO")]
    BiHourlyDaily,

    #[serde(rename = "BIHORARIO_SEMANAL")]
    BiHourlyWeekly,

    #[serde(rename = "TRIHORARIO_DIARIO")]
    TriHourlyDaily,

    #[serde(rename = "TRIHORARIO_SEMANAL")]
    TriHourlyWeekly,

    /// Tri-hourly daily cycle for contracted power above 20.7 kVA.
    #[serde(rename = "TRIHORARIO_DIARIO_HV")]
    TriHourlyDailyHighPower,

    /// Tri-hourly weekly cycle for contracted power above 20.7 kVA.
    #[serde(rename = "TRIHORARIO_SEMANAL_HV")]
    TriHourlyWeeklyHighPower,
}

impl Tariff {
    pub const ALL: [Self; 7] = [
        Self::Simple,
        Self::BiHourlyDaily,
        Self::BiHourlyWeekly,
        Self::TriHourlyDaily,
        Self::TriHourlyWeekly,
        Self::TriHourlyDailyHighPower,
        Self::TriHourlyWeeklyHighPower,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::BiHourlyDaily => "BIHORARIO_DIARIO",
            Self::BiHourlyWeekly => "BIHORARIO_SEMANAL",
            Self::TriHourlyDaily => "TRIHORARIO_DIARIO",
            Self::TriHourlyWeekly => "TRIHORARIO_SEMANAL",
            Self::TriHourlyDailyHighPower => "TRIHORARIO_DIARIO_HV",
            Self::TriHourlyWeeklyHighPower => "TRIHORARIO_SEMANAL_HV",
        }
    }

    /// Name as it appears in the feed.
    #[must_use]
    pub const fn source_name(self) -> &'static str {
        match self {
            Self::Simple => "Simples",
            Self::BiHourlyDaily => "Bi-horário - Ciclo Diário",
            Self::BiHourlyWeekly => "Bi-horário - Ciclo Semanal",
            Self::TriHourlyDaily => "Tri-horário - Ciclo Diário",
            Self::TriHourlyWeekly => "Tri-horário - Ciclo Semanal",
            Self::TriHourlyDailyHighPower => "Tri-horário > 20.7 kVA - Ciclo Diário",
            Self::TriHourlyWeeklyHighPower => "Tri-horário > 20.7 kVA - Ciclo Semanal",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tariff| tariff.code().eq_ignore_ascii_case(code))
    }

    #[must_use]
    pub fn from_source_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tariff| tariff.source_name() == name)
    }
}

impl Display for Tariff {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Tariff {
    type Err = UnknownTariff;

    /// Accept either the internal code or the feed name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::from_code(s)
            .or_else(|| Self::from_source_name(s))
            .ok_or_else(|| UnknownTariff(s.to_owned()))
    }
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown tariff `{0}`")]
pub struct UnknownTariff(pub String);
