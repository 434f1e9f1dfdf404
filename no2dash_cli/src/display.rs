use comfy_table::{presets::NOTHING, *};
use itertools::Itertools;

use no2dash::{
    join::MismatchSide,
    views::{bar::BarChart, change_map::Legend, summary::Summary, trend::TrendChart},
    COL,
};

fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
        )
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn no2(value: f64) -> String {
    format!("{value:.3e}")
}

pub fn countries_table(countries: &[String]) -> Table {
    let mut table = styled_table(&["Country"]);
    for country in countries {
        table.add_row(vec![country]);
    }
    table
}

/// One row per year, one column per series.
pub fn trend_table(chart: &TrendChart) -> Table {
    let header: Vec<&str> = std::iter::once(chart.x_label)
        .chain(chart.series.iter().map(|s| s.country.as_str()))
        .collect();
    let mut table = styled_table(&header);
    for (idx, year) in COL::YEARS.iter().enumerate() {
        let row = std::iter::once(year.to_string()).chain(chart.series.iter().map(|series| {
            series
                .points
                .get(idx)
                .map(|(_, value)| no2(*value))
                .unwrap_or_default()
        }));
        table.add_row(row.collect_vec());
    }
    table
}

pub fn bar_table(chart: &BarChart) -> Table {
    let mut table = styled_table(&[chart.x_label, chart.y_label]);
    for bar in &chart.bars {
        table.add_row(vec![bar.label.to_string(), no2(bar.value)]);
    }
    table
}

pub fn legend_table(legend: &Legend) -> Table {
    let mut table = styled_table(&["Category", "Colour"]);
    for entry in &legend.entries {
        table.add_row(vec![entry.category.label(), entry.color.as_str()]);
    }
    table
}

pub fn summary_table(summary: &Summary) -> Table {
    let mut table = styled_table(&["", "Countries"]);
    table
        .add_row(vec![
            Cell::new("Measured").add_attribute(Attribute::Bold),
            summary.measured.into(),
        ])
        .add_row(vec![
            Cell::new("With geometry").add_attribute(Attribute::Bold),
            summary.outlined.into(),
        ])
        .add_row(vec![
            Cell::new("Joined").add_attribute(Attribute::Bold),
            summary.joined.into(),
        ]);
    for (category, count) in &summary.categories {
        table.add_row(vec![
            Cell::new(category.label()).add_attribute(Attribute::Bold),
            (*count).into(),
        ]);
    }
    for (side, heading) in [
        (MismatchSide::MeasurementsOnly, "Dropped, no geometry"),
        (MismatchSide::GeometriesOnly, "Dropped, no measurements"),
    ] {
        let names = summary.report.dropped(side).join(", ");
        if !names.is_empty() {
            table.add_row(vec![
                Cell::new(heading).add_attribute(Attribute::Bold),
                names.into(),
            ]);
        }
    }
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}
