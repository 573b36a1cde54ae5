use super::domain::{RubricAnswer, SourceModel, SubmittedEvaluation};
use super::identity::{FactKind, IdentityAssigner};
use super::index::ReferenceIndex;
use super::obligations::{ObligationKey, ObligationLedger};
use super::rows::ScoreFact;
use tracing::{debug, info, warn};

/// Rubric columns of a submitted evaluation, in scoring order. Each holds
/// an answer code that references a score definition.
pub const RUBRIC_COLUMNS: [&str; 27] = [
    "1_cumple_con_las_especificaciones_tecnicas",
    "2_entrega_oportuna_del_producto",
    "3_servicio_post-venta",
    "4_entrega_de_certificado_de_calidad",
    "5_cumple_con_las_especificaciones_tecnicas_del_servicio",
    "6_cumple_con_el_programa_de_obra",
    "7_ofrece_capacidad_de_respuesta_ante_las_solicitudes_de_los_clientes",
    "8_aporta_positivamente_a_la_solucion_de_problemas_en_el_proyecto",
    "9_cumple_oportunamente_con_la_documentación_solicitada_para_el_ingreso",
    "10_cumple_oportunamente_con_los_aportes_de_seguridad_social",
    "11_cumple_oportunamente_con_la_realización_de_examenes_ocupacionales",
    "12_participa_activamente_en_actividades_sst_inducciones_capacitaciones",
    "13_cumple_con_el_uso_de_los_elementos_de_proteccion_personal",
    // The upstream column name really contains this space.
    "14_cumple _con_el_reporte_de_todas_las_novedades_del_personal",
    "15_cumple_con_los_reportes_de_accidentes_presentados",
    "16_cumple_oportunamente_con_los_registros_solicitados_del_sg-sst_y_ambiental",
    "17_cumple_con_las_especificaciones_tecnicas_de_los_materiales",
    "18_disponibilidad_del_material",
    "19_entregas_oportunas",
    "20_vigencia_de_licencias_que_apliquen",
    "21_programacion_y_ejecucion_de_los_trabajos_de_campo",
    "22_cumple_con_las_fechas_definidas_para_entrega_de_informes",
    "23_cumple_oportunamente_con_los_registros_solicitados_del_sg-sst_o_cert_calibr",
    "24_cumple_con_el_servicio_dentro_del_programa_establecido",
    "25_cumple_con_los_todos_los_permisos_o_licencias_requeridas",
    "26_continuidad_y_rendimiento_en_la_prestacion_del_servicio",
    "27_suministra_el_personal_competente_para_el_servicio_que_presta",
];

/// Expands each submitted evaluation into one score fact per usable rubric answer.
pub fn normalize_scores(
    model: &SourceModel,
    index: &ReferenceIndex<'_>,
    ledger: &mut ObligationLedger,
    ids: IdentityAssigner,
) -> Vec<ScoreFact> {
    let mut facts = Vec::new();
    let mut skipped_answers = 0usize;

    for evaluation in &model.evaluations {
        let Some(provider_type_id) = evaluation_provider_type(evaluation, index) else {
            continue;
        };

        let obligation_id = ledger.resolve_or_mint(&ObligationKey::for_evaluation(evaluation));

        for answer in &evaluation.answers {
            match score_answer(evaluation, answer, provider_type_id, index) {
                Some((criterion_id, points, max_points)) => facts.push(ScoreFact {
                    id: ids.mint(FactKind::Score, &[evaluation.id.as_str(), answer.column]),
                    source_evaluation_id: evaluation.id.clone(),
                    obligation_fact_id: obligation_id.clone(),
                    criterion_id: criterion_id.to_string(),
                    evaluator_user_id: evaluation.evaluator_id.clone(),
                    points,
                    max_points,
                    date_key: evaluation.date_key.clone(),
                }),
                None => skipped_answers += 1,
            }
        }
    }

    info!(
        scores = facts.len(),
        skipped_answers, "normalized rubric answers into score facts"
    );
    facts
}

fn evaluation_provider_type<'a>(
    evaluation: &SubmittedEvaluation,
    index: &ReferenceIndex<'a>,
) -> Option<&'a str> {
    let Some(provider) = index.provider(&evaluation.provider_id) else {
        warn!(
            evaluation = %evaluation.id,
            provider = %evaluation.provider_id,
            "evaluation references an unknown provider"
        );
        return None;
    };
    let provider_type_id = provider.provider_type_id.as_deref();
    if provider_type_id.is_none() {
        warn!(
            evaluation = %evaluation.id,
            provider = %provider.id,
            "evaluated provider has no provider type"
        );
    }
    provider_type_id
}

fn score_answer<'a>(
    evaluation: &SubmittedEvaluation,
    answer: &RubricAnswer,
    provider_type_id: &str,
    index: &ReferenceIndex<'a>,
) -> Option<(&'a str, f64, f64)> {
    let Some(definition) = index.score_definition(&answer.code) else {
        warn!(
            evaluation = %evaluation.id,
            column = answer.column,
            code = %answer.code,
            "answer code has no score definition"
        );
        return None;
    };

    let criterion_id = definition.criterion_id.as_str();
    let Some(max_points) = index.max_points(provider_type_id, criterion_id) else {
        warn!(
            evaluation = %evaluation.id,
            provider_type = provider_type_id,
            criterion = criterion_id,
            "no maximum score for provider type and criterion"
        );
        return None;
    };

    if index.criterion(criterion_id).is_none() {
        debug!(criterion = criterion_id, "score references a criterion missing from the dimension");
    }

    Some((criterion_id, definition.points, max_points))
}
