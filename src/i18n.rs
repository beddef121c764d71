//! Display strings for the viewer.
//!
//! [`Labels`] is a plain key → string map handed to the presentation layer.
//! Core logic never reads it.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Spanish];

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Español",
        }
    }
}

const ENGLISH: &[(&str, &str)] = &[
    ("file", "File"),
    ("open", "Open…"),
    ("export_report", "Export Analysis Report…"),
    ("columns", "Columns"),
    ("all", "All"),
    ("none", "None"),
    ("data", "Data"),
    ("statistics", "Descriptive Statistics"),
    ("correlation", "Correlation"),
    ("chart", "Chart"),
    ("train", "Train Model"),
    ("features", "Features"),
    ("target", "Target"),
    ("model", "Model"),
    ("no_data", "No data to describe."),
    ("no_numeric", "No numeric columns to correlate."),
    ("no_file", "Open a spreadsheet to begin  (File → Open…)"),
    ("rows_loaded", "rows loaded"),
    ("mse", "Mean Squared Error"),
    ("r2", "R² Score"),
    ("x_axis", "X axis"),
    ("y_axis", "Y axis"),
    ("z_axis", "Z axis"),
    ("bins", "Bins"),
    ("add_to_report", "Add to report"),
    ("charts_in_report", "charts queued for report"),
];

const SPANISH: &[(&str, &str)] = &[
    ("file", "Archivo"),
    ("open", "Abrir…"),
    ("export_report", "Exportar informe…"),
    ("columns", "Columnas"),
    ("all", "Todas"),
    ("none", "Ninguna"),
    ("data", "Datos"),
    ("statistics", "Estadísticas descriptivas"),
    ("correlation", "Correlación"),
    ("chart", "Gráfico"),
    ("train", "Entrenar modelo"),
    ("features", "Variables"),
    ("target", "Objetivo"),
    ("model", "Modelo"),
    ("no_data", "No hay datos para describir."),
    ("no_numeric", "No hay columnas numéricas para correlacionar."),
    ("no_file", "Abra una hoja de cálculo para comenzar  (Archivo → Abrir…)"),
    ("rows_loaded", "filas cargadas"),
    ("mse", "Error cuadrático medio"),
    ("r2", "Puntuación R²"),
    ("x_axis", "Eje X"),
    ("y_axis", "Eje Y"),
    ("z_axis", "Eje Z"),
    ("bins", "Intervalos"),
    ("add_to_report", "Añadir al informe"),
    ("charts_in_report", "gráficos en el informe"),
];

#[derive(Debug, Clone)]
pub struct Labels {
    strings: HashMap<&'static str, &'static str>,
}

impl Labels {
    pub fn for_language(language: Language) -> Self {
        let pack = match language {
            Language::English => ENGLISH,
            Language::Spanish => SPANISH,
        };
        Self {
            strings: pack.iter().copied().collect(),
        }
    }

    /// The string for `key`, or the key itself when the pack lacks it.
    pub fn get<'a>(&self, key: &'a str) -> &'a str {
        self.strings.get(key).copied().unwrap_or(key)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::for_language(Language::English)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_cover_the_same_keys() {
        let english: Vec<&str> = ENGLISH.iter().map(|(k, _)| *k).collect();
        let spanish: Vec<&str> = SPANISH.iter().map(|(k, _)| *k).collect();
        assert_eq!(english, spanish);
    }

    #[test]
    fn metric_labels_are_translated() {
        for (key, label) in crate::training::metric_labels() {
            assert_eq!(Labels::default().get(key), label);
        }
        assert_eq!(Labels::for_language(Language::Spanish).get("r2"), "Puntuación R²");
        assert_eq!(Labels::default().get("unknown_key"), "unknown_key");
    }
}
