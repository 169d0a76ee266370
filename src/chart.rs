//! Renderer-neutral chart payloads.
//!
//! Everything here is a pure mapping from aggregated structures. The only
//! rules enforced are deterministic colors and equal-length parallel arrays.

use serde::Serialize;
use thiserror::Error;

use crate::models::PersonaMetric;
use crate::persona::SCORE_MAX;
use crate::rollup::MonthlyStaffHours;
use crate::timeline::CategorySeries;

pub const PALETTE: [&str; 6] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3",
];

pub fn palette_color(rank: usize) -> &'static str {
    PALETTE[rank % PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("series {series:?}: {field} has {actual} values, expected {expected}")]
    LengthMismatch {
        series: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Timeline,
    StackedBar,
    Polar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Values {
    Labels(Vec<String>),
    Numbers(Vec<f64>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Labels(values) => values.len(),
            Values::Numbers(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<String>,
    pub y: Values,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hover: Vec<String>,
    pub color: String,
}

impl Series {
    /// Builds a series, rejecting any parallel array whose length differs from `x`.
    /// `text` and `hover` may be empty when a series carries no labels.
    pub fn new(
        name: impl Into<String>,
        x: Vec<String>,
        y: Values,
        text: Vec<String>,
        hover: Vec<String>,
        color: impl Into<String>,
    ) -> Result<Self, ChartError> {
        let name = name.into();
        let expected = x.len();

        let checks = [
            ("y", y.len(), false),
            ("text", text.len(), true),
            ("hover", hover.len(), true),
        ];
        for (field, actual, optional) in checks {
            if actual != expected && !(optional && actual == 0) {
                return Err(ChartError::LengthMismatch {
                    series: name,
                    field,
                    expected,
                    actual,
                });
            }
        }

        Ok(Self {
            name,
            x,
            y,
            text,
            hover,
            color: color.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub kind: ChartKind,
    pub x_title: String,
    pub y_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
    pub series: Vec<Series>,
}

impl ChartSeries {
    fn empty(title: &str, kind: ChartKind, x_title: &str, y_title: &str) -> Self {
        Self {
            title: title.to_string(),
            kind,
            x_title: x_title.to_string(),
            y_title: y_title.to_string(),
            y_range: None,
            series: Vec::new(),
        }
    }

    /// True when the renderer should show a "no data" state.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|series| series.y.is_empty())
    }
}

/// One scatter series per category, colored by first-appearance rank.
pub fn timeline_chart(categories: &CategorySeries) -> Result<ChartSeries, ChartError> {
    let mut chart = ChartSeries::empty(
        "Member Journey Timeline",
        ChartKind::Timeline,
        "Date",
        "Intervention Category",
    );

    for (rank, (category, events)) in categories.iter().enumerate() {
        let x = events.iter().map(|event| event.date.to_string()).collect();
        let y = vec![category.to_string(); events.len()];
        let text = events
            .iter()
            .map(|event| event.description.clone())
            .collect();
        let hover = events
            .iter()
            .map(|event| {
                format!(
                    "{}, {}, {}",
                    event.date.display_long(),
                    category,
                    event.description
                )
            })
            .collect();

        chart.series.push(Series::new(
            category,
            x,
            Values::Labels(y),
            text,
            hover,
            palette_color(rank),
        )?);
    }

    Ok(chart)
}

/// One bar series per staff member over the shared, zero-filled month axis.
pub fn staff_hours_chart(hours: &MonthlyStaffHours) -> Result<ChartSeries, ChartError> {
    let mut chart = ChartSeries::empty(
        "Staff Hours by Month",
        ChartKind::StackedBar,
        "Month",
        "Hours",
    );
    let pivot = hours.pivot();
    let axis: Vec<String> = pivot.months.iter().map(ToString::to_string).collect();

    for (rank, (staff, values)) in pivot.series.into_iter().enumerate() {
        chart.series.push(Series::new(
            staff,
            axis.clone(),
            Values::Numbers(values),
            Vec::new(),
            Vec::new(),
            palette_color(rank),
        )?);
    }

    Ok(chart)
}

/// Closed polar trace: the first metric is repeated at the end.
pub fn persona_chart(metrics: &[PersonaMetric]) -> Result<ChartSeries, ChartError> {
    let mut chart = ChartSeries::empty(
        "Member Persona Analysis",
        ChartKind::Polar,
        "Dimension",
        "Score",
    );
    chart.y_range = Some([0.0, f64::from(SCORE_MAX)]);

    let Some(first) = metrics.first() else {
        return Ok(chart);
    };

    let theta = metrics
        .iter()
        .chain(std::iter::once(first))
        .map(|metric| metric.name.to_string())
        .collect();
    let r = metrics
        .iter()
        .chain(std::iter::once(first))
        .map(|metric| f64::from(metric.value))
        .collect();

    chart.series.push(Series::new(
        "Member Persona",
        theta,
        Values::Numbers(r),
        Vec::new(),
        Vec::new(),
        palette_color(0),
    )?);

    Ok(chart)
}
