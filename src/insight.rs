//! Agregador de insights: conteos por periodo, frecuencia de emociones,
//! racha de escritura, rejilla de calor y nube de palabras. Todas las
//! funciones son puras, síncronas y totales sobre entrada vacía; se
//! recalculan en bloque en cada refresco del almacén (volúmenes pequeños).

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::Record;

/// Unidad de calendario para el bucketing por periodo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
}

/// Entrada etiqueta → conteo, serializable para la API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountEntry {
    pub label: String,
    pub count: u32,
}

/// Celda de la rejilla de calor (12 semanas × 7 días).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub week_index: usize,
    pub day_of_week: usize,
    pub count: u32,
    /// Nivel de intensidad 0..=3, proporcional al máximo observado.
    pub level: u8,
}

pub const HEATMAP_WEEKS: usize = 12;
pub const HEATMAP_LEVELS: u32 = 3;
pub const TOP_WORDS: usize = 24;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣A-Za-z]{2,}").expect("regex de palabras válida"));

/// Palabras vacías (coreano + inglés) excluidas de la nube de palabras.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "그", "이", "저", "것", "수", "등", "및", "또", "또는", "있다", "없다",
        "하다", "되다", "이다", "안", "못", "더", "가장", "너무", "매우",
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
    ]
    .into_iter()
    .collect()
});

/// Trunca una fecha al inicio de su unidad (la semana empieza en lunes).
pub fn truncate_to_unit(date: NaiveDate, unit: PeriodUnit) -> NaiveDate {
    match unit {
        PeriodUnit::Day => date,
        PeriodUnit::Week => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
        PeriodUnit::Month => date.with_day(1).unwrap_or(date),
    }
}

fn next_bucket(date: NaiveDate, unit: PeriodUnit) -> Option<NaiveDate> {
    match unit {
        PeriodUnit::Day => date.succ_opt(),
        PeriodUnit::Week => date.checked_add_signed(Duration::days(7)),
        PeriodUnit::Month => date.checked_add_months(Months::new(1)),
    }
}

/// Conteo de registros por bucket de calendario dentro de `[from, to]`,
/// ascendente por clave. Los buckets sin entradas aparecen con conteo 0 para
/// que un gráfico pueda pintar un eje continuo.
pub fn bucket_counts(
    records: &[Record],
    unit: PeriodUnit,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<(NaiveDate, u32)> {
    if to < from {
        return Vec::new();
    }

    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for record in records {
        if record.date >= from && record.date <= to {
            *counts.entry(truncate_to_unit(record.date, unit)).or_insert(0) += 1;
        }
    }

    let mut out = Vec::new();
    let mut bucket = truncate_to_unit(from, unit);
    let last = truncate_to_unit(to, unit);
    while bucket <= last {
        out.push((bucket, counts.get(&bucket).copied().unwrap_or(0)));
        match next_bucket(bucket, unit) {
            Some(next) => bucket = next,
            None => break,
        }
    }
    out
}

/// Frecuencia de cada etiqueta de ánimo presente en los datos (vocabulario
/// abierto: se cuenta cualquier valor que aparezca, sin filtrar por enum).
/// Orden: descendente por conteo; empates según primera aparición.
pub fn emotion_counts(records: &[Record]) -> Vec<CountEntry> {
    count_by_first_seen(records.iter().flat_map(|r| r.feel.iter().map(|s| s.as_str())))
}

/// Racha de escritura: días consecutivos con registro contando hacia atrás
/// desde hoy. Si hoy no hay registro, la racha es 0 aunque exista un tramo
/// anterior largo.
pub fn write_streak(records: &[Record], today: NaiveDate) -> u32 {
    let dates: HashSet<NaiveDate> = records.iter().map(|r| r.date).collect();
    let mut streak = 0;
    let mut day = today;
    while dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Rejilla de calor de las últimas 12 semanas × 7 días de la semana
/// (lunes = fila 0). Cada celda lleva su conteo y un nivel 0..=3:
/// `min(ceil(count / max × 3), 3)`, 0 para celdas sin actividad.
pub fn heatmap_grid(records: &[Record], today: NaiveDate) -> Vec<Vec<HeatmapCell>> {
    let start = truncate_to_unit(today, PeriodUnit::Week)
        - Duration::days(((HEATMAP_WEEKS - 1) * 7) as i64);

    let mut date_counts: HashMap<NaiveDate, u32> = HashMap::new();
    for record in records {
        *date_counts.entry(record.date).or_insert(0) += 1;
    }

    let mut counts = vec![vec![0u32; HEATMAP_WEEKS]; 7];
    for (week, row) in (0..HEATMAP_WEEKS).flat_map(|w| (0..7).map(move |d| (w, d))) {
        let date = start + Duration::days((week * 7 + row) as i64);
        counts[row][week] = date_counts.get(&date).copied().unwrap_or(0);
    }

    let max = counts.iter().flatten().copied().max().unwrap_or(0).max(1);

    counts
        .into_iter()
        .enumerate()
        .map(|(day_of_week, row)| {
            row.into_iter()
                .enumerate()
                .map(|(week_index, count)| HeatmapCell {
                    week_index,
                    day_of_week,
                    count,
                    level: intensity_level(count, max),
                })
                .collect()
        })
        .collect()
}

fn intensity_level(count: u32, max: u32) -> u8 {
    if count == 0 {
        return 0;
    }
    // techo entero de count / max × 3, acotado al nivel superior
    let scaled = (count * HEATMAP_LEVELS).div_ceil(max);
    scaled.min(HEATMAP_LEVELS) as u8
}

/// Nube de palabras: tokens de 2+ caracteres alfabéticos/hangul del título y
/// el cuerpo, en minúsculas, sin palabras vacías; las 24 más frecuentes en
/// orden descendente (empates según primera aparición). Es una ayuda de
/// presentación, no un componente lingüístico.
pub fn word_counts(records: &[Record]) -> Vec<CountEntry> {
    let mut tokens = Vec::new();
    let mut owned = Vec::new();
    for record in records {
        let text = format!("{} {}", record.title, record.content);
        for m in WORD_RE.find_iter(&text) {
            owned.push(m.as_str().to_lowercase());
        }
    }
    for token in &owned {
        if !STOP_WORDS.contains(token.as_str()) {
            tokens.push(token.as_str());
        }
    }

    let mut out = count_by_first_seen(tokens.into_iter());
    out.truncate(TOP_WORDS);
    out
}

/// Conteo con orden de primera aparición; el sort estable conserva ese orden
/// entre empates.
fn count_by_first_seen<'a>(items: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<CountEntry> = Vec::new();

    for item in items {
        match index.get(item) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(item.to_string(), entries.len());
                entries.push(CountEntry {
                    label: item.to_string(),
                    count: 1,
                });
            }
        }
    }

    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(date: &str, feel: &[&str], title: &str, content: &str) -> Record {
        Record {
            id: format!("r-{date}-{title}"),
            title: title.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            feel: feel.iter().map(|s| s.to_string()).collect(),
            content: content.to_string(),
            user_id: "default".to_string(),
            created_at: Utc::now(),
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn buckets_diarios_con_huecos_a_cero() {
        let records = vec![
            record("2026-01-01", &[], "a", "x"),
            record("2026-01-01", &[], "b", "x"),
            record("2026-01-03", &[], "c", "x"),
        ];
        let buckets = bucket_counts(&records, PeriodUnit::Day, d("2026-01-01"), d("2026-01-04"));
        assert_eq!(
            buckets,
            vec![
                (d("2026-01-01"), 2),
                (d("2026-01-02"), 0),
                (d("2026-01-03"), 1),
                (d("2026-01-04"), 0),
            ]
        );
    }

    #[test]
    fn buckets_semanales_empiezan_en_lunes() {
        // 2026-01-07 es miércoles; su semana empieza el lunes 05
        assert_eq!(truncate_to_unit(d("2026-01-07"), PeriodUnit::Week), d("2026-01-05"));
        let records = vec![record("2026-01-07", &[], "a", "x")];
        let buckets =
            bucket_counts(&records, PeriodUnit::Week, d("2026-01-05"), d("2026-01-18"));
        assert_eq!(buckets, vec![(d("2026-01-05"), 1), (d("2026-01-12"), 0)]);
    }

    #[test]
    fn buckets_mensuales() {
        let records = vec![
            record("2025-11-15", &[], "a", "x"),
            record("2026-01-02", &[], "b", "x"),
        ];
        let buckets =
            bucket_counts(&records, PeriodUnit::Month, d("2025-11-01"), d("2026-01-31"));
        assert_eq!(
            buckets,
            vec![
                (d("2025-11-01"), 1),
                (d("2025-12-01"), 0),
                (d("2026-01-01"), 1),
            ]
        );
    }

    #[test]
    fn bucketing_es_idempotente() {
        let records = vec![
            record("2026-01-01", &[], "a", "x"),
            record("2026-01-02", &[], "b", "x"),
        ];
        let a = bucket_counts(&records, PeriodUnit::Day, d("2026-01-01"), d("2026-01-05"));
        let b = bucket_counts(&records, PeriodUnit::Day, d("2026-01-01"), d("2026-01-05"));
        assert_eq!(a, b);
    }

    #[test]
    fn frecuencia_de_emociones_con_empates_por_primera_aparicion() {
        let records = vec![
            record("2026-01-01", &["기쁨"], "a", "x"),
            record("2026-01-02", &["기쁨", "슬픔"], "b", "x"),
            record("2026-01-03", &["슬픔"], "c", "x"),
        ];
        let counts = emotion_counts(&records);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].label, "기쁨");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].label, "슬픔");
        assert_eq!(counts[1].count, 2);
    }

    #[test]
    fn vocabulario_de_emociones_abierto() {
        let records = vec![record("2026-01-01", &["뿌듯함"], "a", "x")];
        let counts = emotion_counts(&records);
        assert_eq!(counts[0].label, "뿌듯함");
    }

    #[test]
    fn racha_incluyendo_hoy() {
        let today = d("2026-02-01");
        let records = vec![
            record("2026-02-01", &[], "a", "x"),
            record("2026-01-31", &[], "b", "x"),
            record("2026-01-30", &[], "c", "x"),
            // hueco el 29
            record("2026-01-28", &[], "d", "x"),
        ];
        assert_eq!(write_streak(&records, today), 3);
    }

    #[test]
    fn racha_cero_si_hoy_no_hay_registro() {
        let today = d("2026-02-01");
        let records = vec![
            record("2026-01-31", &[], "a", "x"),
            record("2026-01-30", &[], "b", "x"),
        ];
        assert_eq!(write_streak(&records, today), 0);
    }

    #[test]
    fn rejilla_de_calor_dimensiones_y_niveles() {
        let today = d("2026-02-01");
        let records = vec![
            record("2026-02-01", &[], "a", "x"),
            record("2026-02-01", &[], "b", "x"),
            record("2026-02-01", &[], "c", "x"),
            record("2026-01-30", &[], "d", "x"),
        ];
        let grid = heatmap_grid(&records, today);
        assert_eq!(grid.len(), 7);
        for row in &grid {
            assert_eq!(row.len(), HEATMAP_WEEKS);
        }

        // 2026-02-01 es domingo: fila 6, última semana
        let sunday = &grid[6][HEATMAP_WEEKS - 1];
        assert_eq!(sunday.count, 3);
        assert_eq!(sunday.level, 3);

        // 2026-01-30 es viernes de la misma semana: 1/3 → ceil = nivel 1
        let friday = &grid[4][HEATMAP_WEEKS - 1];
        assert_eq!(friday.count, 1);
        assert_eq!(friday.level, 1);

        // Semana sin actividad: todo nivel 0
        assert!(grid.iter().all(|row| row[0].level == 0));
    }

    #[test]
    fn rejilla_vacia_todo_a_cero() {
        let grid = heatmap_grid(&[], d("2026-02-01"));
        assert!(grid.iter().flatten().all(|c| c.count == 0 && c.level == 0));
    }

    #[test]
    fn nube_de_palabras_filtra_vacias_y_corta_a_24() {
        let mut content = String::new();
        for i in 0..30 {
            // wordXX aparece i+1 veces → 30 palabras distintas
            for _ in 0..=i {
                content.push_str(&format!("word{i:02} "));
            }
        }
        content.push_str("the and 못 가장");
        let records = vec![record("2026-01-01", &[], "제목", &content)];

        let counts = word_counts(&records);
        assert_eq!(counts.len(), TOP_WORDS);
        assert_eq!(counts[0].label, "word29");
        assert_eq!(counts[0].count, 30);
        assert!(counts.iter().all(|c| c.label != "the" && c.label != "가장"));
    }

    #[test]
    fn nube_de_palabras_tokeniza_hangul_y_minusculas() {
        let records = vec![record("2026-01-01", &[], "산책 일기", "Hoy 산책 y Mas 산책")];
        let counts = word_counts(&records);
        let walk = counts.iter().find(|c| c.label == "산책").unwrap();
        assert_eq!(walk.count, 3);
        assert!(counts.iter().any(|c| c.label == "hoy"));
        // la "y" de un solo carácter no es token
        assert!(counts.iter().all(|c| c.label != "y"));
    }
}
