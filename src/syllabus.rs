use crate::models::Category;

pub struct SubjectTemplate {
    pub name: &'static str,
    pub category: Category,
    pub icon: &'static str,
    pub topics: &'static [&'static str],
}

// Seeded into every new profile, in this order
pub static DEFAULT_SYLLABUS: &[SubjectTemplate] = &[
    SubjectTemplate {
        name: "Matemáticas II",
        category: Category::Science,
        icon: "📐",
        topics: &[
            "Matrices y Determinantes",
            "Sistemas de Ecuaciones",
            "Vectores en el Espacio",
            "Rectas y Planos",
            "Problemas Métricos (Distancias/Ángulos)",
            "Límites y Continuidad",
            "Derivadas y Aplicaciones",
            "Representación de Funciones",
            "Integrales Indefinidas",
            "Integrales Definidas y Áreas",
            "Probabilidad",
            "Estadística",
        ],
    },
    SubjectTemplate {
        name: "Física",
        category: Category::Science,
        icon: "⚡",
        topics: &[
            "Interacción Gravitatoria",
            "Campo Eléctrico",
            "Campo Magnético",
            "Inducción Electromagnética",
            "Movimiento Armónico Simple",
            "Movimiento Ondulatorio",
            "Óptica Geométrica",
            "Física Relativista",
            "Física Cuántica",
            "Física Nuclear",
        ],
    },
    SubjectTemplate {
        name: "Química",
        category: Category::Science,
        icon: "🧪",
        topics: &[
            "Estructura Atómica",
            "Sistema Periódico",
            "Enlace Químico",
            "Termoquímica",
            "Cinética Química",
            "Equilibrio Químico",
            "Reacciones Ácido-Base",
            "Reacciones REDOX",
            "Química Orgánica: Formulación",
            "Química Orgánica: Reactividad",
        ],
    },
    SubjectTemplate {
        name: "Historia de España",
        category: Category::Memory,
        icon: "🏰",
        topics: &[
            "Raíces Históricas (Prehistoria-Reyes Católicos)",
            "Siglo XVI y XVII (Austrias)",
            "Siglo XVIII (Borbones)",
            "Crisis del Antiguo Régimen (1808-1833)",
            "Construcción Estado Liberal (1833-1868)",
            "Sexenio Democrático (1868-1874)",
            "La Restauración (1875-1902)",
            "Crisis de la Restauración (1902-1931)",
            "II República (1931-1936)",
            "Guerra Civil (1936-1939)",
            "Franquismo (1939-1975)",
            "Transición y Democracia",
        ],
    },
    SubjectTemplate {
        name: "Lengua y Literatura",
        category: Category::Skills,
        icon: "📖",
        topics: &[
            "Morfología",
            "Sintaxis: Oración Simple",
            "Sintaxis: Oración Compuesta",
            "Coherencia y Cohesión",
            "Tipología Textual",
            "Literatura S.XX (Poesía)",
            "Literatura S.XX (Novela)",
            "Literatura S.XX (Teatro)",
            "Generación del 98",
            "Generación del 27",
        ],
    },
    SubjectTemplate {
        name: "Inglés",
        category: Category::Skills,
        icon: "🇬🇧",
        topics: &[
            "Tenses Mix",
            "Passive Voice",
            "Reported Speech",
            "Conditionals & Wish",
            "Modals",
            "Relative Clauses",
            "Connectors",
            "Writing: Opinion Essay",
            "Writing: Email/Letter",
            "Reading Comprehension",
        ],
    },
];

pub fn subject(name: &str) -> Option<&'static SubjectTemplate> {
    DEFAULT_SYLLABUS.iter().find(|s| s.name == name)
}

pub fn icon_for(subject_name: &str) -> &'static str {
    subject(subject_name).map(|s| s.icon).unwrap_or("📚")
}

#[cfg(test)]
pub fn topic_count() -> usize {
    DEFAULT_SYLLABUS.iter().map(|s| s.topics.len()).sum()
}
