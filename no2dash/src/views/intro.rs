use std::fmt::Display;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: &'static str,
    pub lines: Vec<&'static str>,
}

/// Static project overview shown on the Introduction view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Introduction {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub summary: &'static str,
    pub sections: Vec<Section>,
    pub goal: &'static str,
}

impl Default for Introduction {
    fn default() -> Self {
        Self {
            title: "African NO₂ Dashboard",
            subtitle: "Project Overview",
            summary: "This dashboard analyzes Nitrogen dioxide (NO₂) levels across African \
                      countries using data from Sentinel-5P.",
            sections: vec![
                Section {
                    heading: "Data Source",
                    lines: vec![
                        "Satellite: Sentinel-5P (Copernicus)",
                        "Band: NO2_column_number_density",
                        "Source: Google Earth Engine (GEE)",
                    ],
                },
                Section {
                    heading: "Workflow Summary",
                    lines: vec![
                        "Africa shapefile or GeoJSON loaded",
                        "Nitrogen dioxide (NO₂) levels were obtained from Google Earth Engine \
                         for the years 2018, 2020, 2022, and 2024 and exported as CSV",
                        "Processed and cleaned",
                        "Visualized as change map, trend and bar charts",
                    ],
                },
            ],
            goal: "The goal is to compare NO₂ trends across countries, to identify changes, \
                   both increases and decreases, from 2018 to 2024.",
        }
    }
}

impl Display for Introduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}\n", self.title)?;
        writeln!(f, "{}", self.subtitle)?;
        writeln!(f, "{}\n", self.summary)?;
        for section in &self.sections {
            writeln!(f, "{}", section.heading)?;
            for (idx, line) in section.lines.iter().enumerate() {
                writeln!(f, "  {}. {line}", idx + 1)?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduction_names_the_data_source() {
        let text = Introduction::default().to_string();
        assert!(text.starts_with("African NO₂ Dashboard"));
        assert!(text.contains("  1. Satellite: Sentinel-5P (Copernicus)"));
        assert!(text.contains("NO2_column_number_density"));
    }
}
