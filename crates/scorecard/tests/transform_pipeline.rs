use scorecard::config::ExportFormat;
use scorecard::export::{export_bundle, DirectorySink};
use scorecard::source::{RawRecord, SourceTable, SourceTables, ROW_ID};
use scorecard::transform::scores::RUBRIC_COLUMNS;
use scorecard::transform::WarehouseTable;
use scorecard::{transform, TransformError, WarehouseBundle};
use std::collections::BTreeMap;

fn row(id: &str) -> RawRecord {
    RawRecord::new().with(ROW_ID, id)
}

fn evaluation(id: &str, evaluator: &str, answers: &[(usize, &str)]) -> RawRecord {
    answers.iter().fold(
        row(id)
            .with("id_obra", "W1")
            .with("id_proveedor", "P1")
            .with("id_corte_evaluacion", "C1")
            .with("evaluador", evaluator)
            .with("fecha_evaluacion", "6/2/2024 10:30:00"),
        |record, (column, code)| record.with(RUBRIC_COLUMNS[*column], *code),
    )
}

/// Site W1 staffs {U1, U2}; provider type T1 is evaluated by role R1 = {U2, U3}.
fn snapshot(period_plans: &str, evaluations: Vec<RawRecord>) -> SourceTables {
    SourceTables::new()
        .with(
            SourceTable::Providers,
            vec![row("P1")
                .with("nombre_proveedor", "Concretos del Norte")
                .with("id_tipo_proveedor", "T1")],
        )
        .with(
            SourceTable::ProviderTypes,
            vec![row("T1").with("nombre_tipo_proveedor", "Suministro")],
        )
        .with(
            SourceTable::Users,
            vec![
                row("U1").with("nombre_usuario", "Ana").with("id_rol", "R0"),
                row("U2").with("nombre_usuario", "Beto").with("id_rol", "R1"),
                row("U3").with("nombre_usuario", "Caro").with("id_rol", "R1"),
            ],
        )
        .with(
            SourceTable::Roles,
            vec![
                row("R0").with("nombre_rol", "Director"),
                row("R1")
                    .with("nombre_rol", "Residente")
                    .with("Related usuarios", "U2 , U3"),
            ],
        )
        .with(
            SourceTable::WorkSites,
            vec![row("W1").with("nombre_obra", "Torre Norte")],
        )
        .with(
            SourceTable::SiteAssignments,
            vec![
                row("A1").with("id_obra", "W1").with("id_usuario", "U1"),
                row("A2").with("id_obra", "W1").with("id_usuario", "U2"),
            ],
        )
        .with(
            SourceTable::TypeRoleLinks,
            vec![row("L1").with("id_tipo_proveedor", "T1").with("id_rol", "R1")],
        )
        .with(
            SourceTable::EvaluationPeriods,
            vec![row("C1")
                .with("fecha_corte", "6/30/2024")
                .with("Related planes_de_evaluacions", period_plans)],
        )
        .with(
            SourceTable::EvaluationPlans,
            vec![
                row("PL1")
                    .with("id_proveedor", "P1")
                    .with("id_obra", "W1")
                    .with("id_corte_evaluacion", "C1"),
                row("PL2")
                    .with("id_proveedor", "P1")
                    .with("id_obra", "W1")
                    .with("id_corte_evaluacion", "C1"),
            ],
        )
        .with(
            SourceTable::ScoreDefinitions,
            vec![
                row("S1-high")
                    .with("id_tipo_proveedor", "T1")
                    .with("id_criterio", "K1")
                    .with("puntaje", "5"),
                row("S1-low")
                    .with("id_tipo_proveedor", "T1")
                    .with("id_criterio", "K1")
                    .with("puntaje", 2),
                row("S2")
                    .with("id_tipo_proveedor", "T1")
                    .with("id_criterio", "K2")
                    .with("puntaje", "10"),
                row("S3")
                    .with("id_tipo_proveedor", "T1")
                    .with("id_criterio", "K3")
                    .with("puntaje", "3"),
            ],
        )
        .with(
            SourceTable::Criteria,
            vec![
                row("K1").with("nombre_criterio", "Calidad"),
                row("K2").with("nombre_criterio", "Oportunidad"),
                row("K3").with("nombre_criterio", "Seguridad"),
            ],
        )
        .with(SourceTable::SubmittedEvaluations, evaluations)
}

fn obligation_keys(bundle: &WarehouseBundle) -> Vec<(&str, &str, &str, &str, bool)> {
    bundle
        .fact_obligation
        .iter()
        .map(|fact| {
            (
                fact.work_site_id.as_str(),
                fact.provider_id.as_str(),
                fact.period_id.as_str(),
                fact.user_id.as_str(),
                fact.fulfilled,
            )
        })
        .collect()
}

#[test]
fn only_users_both_on_site_and_in_role_are_obliged() {
    let bundle = transform(&snapshot("PL1", Vec::new())).expect("transform succeeds");

    assert_eq!(
        obligation_keys(&bundle),
        vec![("W1", "P1", "C1", "U2", false)],
        "U1 lacks the role and U3 is not on the site"
    );
    assert!(bundle.fact_obligation[0].planned);
    assert_eq!(
        bundle.fact_obligation[0].source_plan_id.as_deref(),
        Some("PL1")
    );
    assert!(bundle.fact_score.is_empty());
}

#[test]
fn submission_fulfils_the_obligation_and_links_scores() {
    let evaluations = vec![evaluation("E1", "U2", &[(0, "S1-low"), (1, "S2"), (26, "S3")])];
    let bundle = transform(&snapshot("PL1", evaluations)).expect("transform succeeds");

    assert_eq!(
        obligation_keys(&bundle),
        vec![("W1", "P1", "C1", "U2", true)]
    );

    let obligation_id = &bundle.fact_obligation[0].id;
    let scores: Vec<_> = bundle
        .fact_score
        .iter()
        .map(|fact| (fact.criterion_id.as_str(), fact.points, fact.max_points))
        .collect();
    assert_eq!(
        scores,
        vec![("K1", 2.0, 5.0), ("K2", 10.0, 10.0), ("K3", 3.0, 3.0)]
    );
    assert!(bundle
        .fact_score
        .iter()
        .all(|fact| &fact.obligation_fact_id == obligation_id
            && fact.evaluator_user_id == "U2"
            && fact.date_key.as_deref() == Some("2024-06-02")));
}

#[test]
fn overlapping_plans_do_not_duplicate_obligations() {
    let bundle = transform(&snapshot("PL1, PL2, PL404", Vec::new())).expect("transform succeeds");

    assert_eq!(bundle.fact_obligation.len(), 1);
    assert_eq!(
        bundle.fact_obligation[0].source_plan_id.as_deref(),
        Some("PL1")
    );
}

#[test]
fn plans_with_dangling_provider_or_site_do_not_abort_the_run() {
    let mut tables = snapshot("PLP, PLW, PL1", Vec::new());
    tables.insert(
        SourceTable::EvaluationPlans,
        vec![
            row("PLP")
                .with("id_proveedor", "P404")
                .with("id_obra", "W1")
                .with("id_corte_evaluacion", "C1"),
            row("PLW")
                .with("id_proveedor", "P1")
                .with("id_obra", "W404")
                .with("id_corte_evaluacion", "C1"),
            row("PL1")
                .with("id_proveedor", "P1")
                .with("id_obra", "W1")
                .with("id_corte_evaluacion", "C1"),
        ],
    );

    let bundle = transform(&tables).expect("dangling plans are skipped, not fatal");

    assert_eq!(
        obligation_keys(&bundle),
        vec![("W1", "P1", "C1", "U2", false)]
    );
    assert_eq!(
        bundle.fact_obligation[0].source_plan_id.as_deref(),
        Some("PL1")
    );
}

#[test]
fn unplanned_submission_still_gets_an_obligation() {
    let evaluations = vec![evaluation("E9", "U3", &[(2, "S3")])];
    let bundle = transform(&snapshot("", evaluations)).expect("transform succeeds");

    assert_eq!(bundle.fact_obligation.len(), 1);
    let obligation = &bundle.fact_obligation[0];
    assert!(!obligation.planned);
    assert!(obligation.fulfilled);
    assert_eq!(obligation.user_id, "U3");
    assert_eq!(bundle.fact_score[0].obligation_fact_id, obligation.id);
}

#[test]
fn every_score_references_an_emitted_obligation() {
    let evaluations = vec![
        evaluation("E1", "U2", &[(0, "S1-high")]),
        evaluation("E2", "U1", &[(1, "S2"), (2, "unknown-code")]),
    ];
    let bundle = transform(&snapshot("PL1", evaluations)).expect("transform succeeds");

    assert_eq!(bundle.fact_score.len(), 2);
    for score in &bundle.fact_score {
        assert!(bundle
            .fact_obligation
            .iter()
            .any(|obligation| obligation.id == score.obligation_fact_id));
    }
}

#[test]
fn date_dimension_covers_evaluation_and_period_dates() {
    let evaluations = vec![evaluation("E1", "U2", &[(0, "S1-high")])];
    let bundle = transform(&snapshot("PL1", evaluations)).expect("transform succeeds");

    let keys: Vec<_> = bundle.dim_date.iter().map(|d| d.date_key.as_str()).collect();
    assert_eq!(keys, vec!["2024-06-02", "2024-06-30"]);

    let sunday = &bundle.dim_date[0];
    assert_eq!(sunday.weekday_name, "Domingo");
    assert_eq!(sunday.weekday_num, 0);
    assert_eq!(sunday.month_name, "Junio");
    assert_eq!(sunday.quarter, "Q2");
    assert_eq!(
        bundle.dim_evaluation_period[0].date_key.as_deref(),
        Some("2024-06-30")
    );
}

#[test]
fn unusable_evaluations_still_contribute_their_dates() {
    let orphan = row("E2")
        .with("id_obra", "W1")
        .with("id_proveedor", "P1")
        .with("fecha_evaluacion", "7/15/2024");
    let bundle = transform(&snapshot("PL1", vec![orphan])).expect("transform succeeds");

    assert!(bundle.fact_score.is_empty());
    let keys: Vec<_> = bundle.dim_date.iter().map(|d| d.date_key.as_str()).collect();
    assert_eq!(keys, vec!["2024-06-30", "2024-07-15"]);
}

#[test]
fn duplicate_evaluation_ids_do_not_duplicate_score_ids() {
    let evaluations = vec![
        evaluation("E1", "U2", &[(0, "S1-high")]),
        evaluation("E1", "U1", &[(0, "S1-low")]),
    ];
    let bundle = transform(&snapshot("PL1", evaluations)).expect("transform succeeds");

    assert_eq!(bundle.fact_score.len(), 1);
    assert_eq!(bundle.fact_score[0].evaluator_user_id, "U2");
}

#[test]
fn dimensions_are_projected_from_reference_tables() {
    let bundle = transform(&snapshot("PL1", Vec::new())).expect("transform succeeds");

    assert_eq!(bundle.dim_provider[0].provider_type_id, "T1");
    assert_eq!(bundle.dim_user.len(), 3);
    assert_eq!(bundle.dim_role.len(), 2);
    assert_eq!(bundle.dim_criterion.len(), 3);
    assert_eq!(bundle.dim_work_site[0].name, "Torre Norte");
    assert_eq!(bundle.dim_provider_type[0].name, "Suministro");
}

#[test]
fn identical_snapshots_produce_identical_ids() {
    let evaluations = || vec![evaluation("E1", "U2", &[(0, "S1-high"), (1, "S2")])];
    let first = transform(&snapshot("PL1", evaluations())).expect("first run");
    let second = transform(&snapshot("PL1", evaluations())).expect("second run");

    assert_eq!(first, second);
}

#[test]
fn missing_mandatory_table_aborts_the_run() {
    let raw: BTreeMap<String, Vec<RawRecord>> = snapshot("PL1", Vec::new()).into();
    let without_providers: BTreeMap<_, _> = raw
        .into_iter()
        .filter(|(name, _)| name != "proveedores")
        .collect();
    let tables = SourceTables::from(without_providers);

    match transform(&tables) {
        Err(TransformError::MissingInput { table }) => assert_eq!(table, "proveedores"),
        other => panic!("expected missing proveedores, got {other:?}"),
    }
}

#[test]
fn snapshot_json_uses_native_table_names() {
    let payload = serde_json::json!({
        "proveedores": [{ "Row ID": "P1", "id_tipo_proveedor": "T1" }],
        "roles": [],
        "tabla_desconocida": [{ "Row ID": "X" }]
    });
    let tables: SourceTables = serde_json::from_value(payload).expect("snapshot decodes");

    assert!(tables.contains(SourceTable::Providers));
    assert_eq!(tables.total_records(), 1);

    let bundle = transform(&tables).expect("transform succeeds");
    assert_eq!(bundle.dim_provider.len(), 1);
    assert!(bundle.fact_obligation.is_empty());
}

#[test]
fn bundle_exports_one_csv_per_populated_table() {
    let evaluations = vec![evaluation("E1", "U2", &[(0, "S1-high")])];
    let bundle = transform(&snapshot("PL1", evaluations)).expect("transform succeeds");
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sink = DirectorySink::new(dir.path(), ExportFormat::Csv).expect("sink");

    let written = export_bundle(&bundle, &mut sink).expect("export succeeds");

    assert_eq!(written.len(), WarehouseTable::ordered().len());
    let scores = std::fs::read_to_string(dir.path().join("fact_score.csv")).expect("scores");
    let mut lines = scores.lines();
    assert_eq!(
        lines.next(),
        Some("id,source_evaluation_id,obligation_fact_id,criterion_id,evaluator_user_id,points,max_points,date_key")
    );
    assert_eq!(lines.count(), 1);
}
