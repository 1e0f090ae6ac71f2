use chmask_contracts::{
    FilterContext, MaskSpec, Statement, StatementTarget, Window, format_timestamp,
};
use chmask_policy::MaskSpecRegistry;

const SET_SEPARATOR: &str = ",\n    ";

/// Renders the update statement for one table and one window.
///
/// Literals are emitted verbatim; the mask spec is trusted to hold pre-quoted
/// constants. Output is byte-stable for identical inputs.
pub fn build(
    spec: &MaskSpec,
    target: &StatementTarget,
    filter: &FilterContext,
    window: &Window,
) -> Statement {
    let sets = spec
        .columns
        .iter()
        .map(|mask| format!("{} = {}", mask.column, mask.value))
        .collect::<Vec<_>>()
        .join(SET_SEPARATOR);

    let date_field = spec.date_field.as_str();
    let mut conditions = vec![
        format!("customer_id = {}", filter.customer_id),
        format!(
            "{} >= toDateTime('{}')",
            date_field,
            format_timestamp(&window.start)
        ),
        format!(
            "{} < toDateTime('{}')",
            date_field,
            format_timestamp(&window.end)
        ),
    ];
    if let Some(engine_id) = filter.engine_id {
        conditions.push(format!("engine_id = {}", engine_id));
    }

    let on_cluster = target
        .cluster
        .as_deref()
        .map(|cluster| format!(" ON CLUSTER {}", cluster))
        .unwrap_or_default();

    let text = format!(
        "ALTER TABLE {}{}\nUPDATE\n    {}\nWHERE\n    {};",
        target.qualified_table(&spec.table_name),
        on_cluster,
        sets,
        conditions.join(" AND ")
    );

    Statement {
        table_name: spec.table_name.clone(),
        window: *window,
        text,
    }
}

/// Lazily yields every statement of a run, table-major then time-ascending.
pub fn statements<'a>(
    registry: &'a MaskSpecRegistry,
    target: &'a StatementTarget,
    filter: &'a FilterContext,
    windows: &'a [Window],
) -> impl Iterator<Item = Statement> + 'a {
    registry.iter().flat_map(move |spec| {
        windows
            .iter()
            .map(move |window| build(spec, target, filter, window))
    })
}
