use exam_core::model::{
    Difficulty, NormativeReference, OptionLabel, Question, QuestionDraft, QuestionError,
    QuestionOption,
};

struct Sample {
    id: &'static str,
    prompt: &'static str,
    context: Option<&'static str>,
    options: [&'static str; 4],
    correct: &'static str,
    competency: &'static str,
    difficulty: Difficulty,
    source: &'static str,
    article: Option<&'static str>,
    explanation: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "seed-pei-ley115-73",
        prompt: "Según la Ley 115 de 1994, ¿qué debe elaborar y poner en práctica cada establecimiento educativo para lograr la formación integral del educando?",
        context: None,
        options: [
            "El manual de funciones",
            "El Proyecto Educativo Institucional (PEI)",
            "El plan de mejoramiento municipal",
            "El sistema de evaluación docente",
        ],
        correct: "B",
        competency: "Gestión institucional",
        difficulty: Difficulty::Low,
        source: "Ley 115 de 1994",
        article: Some("73"),
        explanation: "El artículo 73 ordena a cada establecimiento elaborar y poner en práctica un PEI con participación de la comunidad educativa.",
    },
    Sample {
        id: "seed-estatuto-1278",
        prompt: "¿Qué norma establece el Estatuto de Profesionalización Docente que rige a quienes ingresan al servicio por concurso desde 2002?",
        context: None,
        options: [
            "Decreto 2277 de 1979",
            "Ley 715 de 2001",
            "Decreto Ley 1278 de 2002",
            "Decreto 1290 de 2009",
        ],
        correct: "C",
        competency: "Normativa docente",
        difficulty: Difficulty::Low,
        source: "Decreto Ley 1278 de 2002",
        article: Some("1"),
        explanation: "El Decreto Ley 1278 de 2002 regula el ingreso, permanencia, ascenso y retiro de los docentes vinculados por concurso.",
    },
    Sample {
        id: "seed-siee-1290",
        prompt: "Un consejo académico revisa los criterios de promoción de los estudiantes. ¿A qué instancia corresponde definir el sistema institucional de evaluación de los estudiantes?",
        context: Some("Una institución educativa rural quiere ajustar su escala de valoración para el próximo año lectivo."),
        options: [
            "A la secretaría de educación certificada",
            "Al Ministerio de Educación Nacional",
            "Al establecimiento educativo, con aprobación del consejo directivo",
            "A la asociación de padres de familia",
        ],
        correct: "C",
        competency: "Evaluación",
        difficulty: Difficulty::Medium,
        source: "Decreto 1290 de 2009",
        article: Some("4"),
        explanation: "El Decreto 1290 faculta a cada establecimiento para definir su sistema institucional de evaluación, aprobado por el consejo directivo.",
    },
    Sample {
        id: "seed-convivencia-1620",
        prompt: "Ante una situación de acoso escolar reiterado, ¿qué herramienta de la Ley 1620 de 2013 orienta las acciones de la institución?",
        context: Some("Un estudiante de grado séptimo recibe burlas sistemáticas a través de redes sociales por parte de compañeros de curso."),
        options: [
            "La Ruta de Atención Integral para la Convivencia Escolar",
            "El plan de área de ciencias sociales",
            "El reglamento de la asociación de exalumnos",
            "El Plan Decenal de Educación",
        ],
        correct: "A",
        competency: "Convivencia escolar",
        difficulty: Difficulty::Medium,
        source: "Ley 1620 de 2013",
        article: Some("29"),
        explanation: "La Ruta de Atención Integral define los procesos y protocolos que deben seguir las instituciones frente a situaciones que afectan la convivencia.",
    },
    Sample {
        id: "seed-gobierno-escolar-142",
        prompt: "¿Qué órganos conforman el gobierno escolar de las instituciones educativas estatales según la Ley 115 de 1994?",
        context: None,
        options: [
            "Rector, personero y contralor",
            "Consejo directivo, consejo académico y rector",
            "Consejo de padres, comité de convivencia y coordinador",
            "Secretario de educación, rector y consejo estudiantil",
        ],
        correct: "B",
        competency: "Gestión institucional",
        difficulty: Difficulty::Medium,
        source: "Ley 115 de 1994",
        article: Some("142"),
        explanation: "El artículo 142 establece que el gobierno escolar está conformado por el consejo directivo, el consejo académico y el rector.",
    },
    Sample {
        id: "seed-dur-1075",
        prompt: "¿Cuál es la norma que compila las disposiciones reglamentarias del sector educación en Colombia?",
        context: None,
        options: [
            "Decreto 1075 de 2015",
            "Ley 30 de 1992",
            "Decreto 1860 de 1994",
            "Resolución 09317 de 2016",
        ],
        correct: "A",
        competency: "Normativa docente",
        difficulty: Difficulty::High,
        source: "Decreto 1075 de 2015",
        article: None,
        explanation: "El Decreto Único Reglamentario del Sector Educación recoge en un solo cuerpo la reglamentación vigente del sector.",
    },
];

/// Sample questions on Colombian education law for an offline question bank.
///
/// # Errors
///
/// Returns `QuestionError` if a sample fails validation.
pub fn sample_questions() -> Result<Vec<Question>, QuestionError> {
    SAMPLES.iter().map(to_question).collect()
}

fn to_question(sample: &Sample) -> Result<Question, QuestionError> {
    let options = ["A", "B", "C", "D"]
        .into_iter()
        .zip(sample.options)
        .map(|(label, text)| {
            Ok(QuestionOption {
                label: OptionLabel::new(label)?,
                text: text.to_string(),
            })
        })
        .collect::<Result<Vec<_>, QuestionError>>()?;

    QuestionDraft {
        id: sample.id.to_string(),
        prompt: sample.prompt.to_string(),
        context: sample.context.map(str::to_string),
        options,
        correct: sample.correct.to_string(),
        competency: sample.competency.to_string(),
        difficulty: sample.difficulty,
        reference: NormativeReference {
            source: sample.source.to_string(),
            article: sample.article.map(str::to_string),
            explanation: sample.explanation.to_string(),
        },
    }
    .validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn samples_are_valid_and_unique() {
        let questions = sample_questions().unwrap();
        assert_eq!(questions.len(), SAMPLES.len());
        let ids: HashSet<_> = questions.iter().map(|q| q.id().clone()).collect();
        assert_eq!(ids.len(), questions.len());
        assert!(questions.iter().all(|q| q.options().len() == 4));
    }
}
