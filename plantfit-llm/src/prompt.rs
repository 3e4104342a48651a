//! Prompt templates for plant search and fit scoring.
//!
//! Prompts are written in Polish, and every figure is formatted the pl-PL
//! way (decimal comma). Templates are plain `{key}` strings rendered with
//! [`render_template`]; the builders below are pure functions of their input.

use crate::types::{FitContext, MonthlyWeather, Prompt};

/// Longest query passed to the model, in characters.
pub const MAX_QUERY_CHARS: usize = 100;

/// Search prompt: expert persona and output contract.
pub const SEARCH_SYSTEM: &str = r#"Jesteś doświadczonym ogrodnikiem i botanikiem. Pomagasz identyfikować rośliny ogrodowe na podstawie nazw zwyczajowych lub naukowych.

ZASADY:
- Zwróć od 1 do 5 propozycji, zaczynając od najlepiej pasującej.
- Każda propozycja ma nazwę zwyczajową ("name") i nazwę łacińską ("latin_name") albo null, jeśli nie jesteś jej pewien.
- Nie wymyślaj gatunków. Jeśli nazwa jest niejednoznaczna, podaj jej najczęstsze znaczenia.
- Nie używaj znaczników HTML ani Markdown.
- Odpowiadasz wyłącznie poprawnym JSON-em zgodnym ze schematem."#;

pub const SEARCH_USER: &str = r#"Znajdź rośliny pasujące do zapytania: "{query}"

Zwróć JSON:
{"candidates": [{"name": "nazwa zwyczajowa", "latin_name": "nazwa łacińska lub null"}]}"#;

/// Fit prompt: scoring rubric and seasonal weighting.
pub const FIT_SYSTEM: &str = r#"Jesteś ekspertem ogrodnictwa i agroklimatologii. Oceniasz, jak dobrze roślina pasuje do warunków konkretnego stanowiska w ogrodzie.

Oceń w skali 1-5 każdy parametr:
- sunlight_score: nasłonecznienie stanowiska względem wymagań rośliny
- humidity_score: wilgotność powietrza
- precipitation_score: opady
- temperature_score: temperatury w ciągu roku
- overall_score: ocena ogólna, nie wyższa niż najsłabszy parametr o kluczowym znaczeniu dla rośliny

SKALA:
5 = warunki idealne
4 = warunki dobre, drobne odstępstwa
3 = warunki akceptowalne, roślina wymaga dodatkowej opieki
2 = warunki słabe, uprawa ryzykowna
1 = warunki nieodpowiednie

WAGI SEZONOWE ({hemisphere}):
- Miesiące sezonu wegetacyjnego ({growing_months}) mają wagę 2.
- Pozostałe miesiące ({dormant_months}) mają wagę 1.

ZASADY:
- Uzasadnienie ("explanation") piszesz po polsku, ma co najmniej 50 znaków i odnosi się do podanych danych.
- Odpowiadasz wyłącznie poprawnym JSON-em zgodnym ze schematem."#;

pub const FIT_USER: &str = r#"Roślina: {plant_name}

LOKALIZACJA:
{location_lines}

KLIMAT (średnie roczne):
{climate_lines}

STANOWISKO NA SIATCE:
{cell_lines}

DANE MIESIĘCZNE:
{monthly_lines}

Oceń dopasowanie rośliny do tego stanowiska. Zwróć JSON:
{"sunlight_score": <1-5>, "humidity_score": <1-5>, "precipitation_score": <1-5>, "temperature_score": <1-5>, "overall_score": <1-5>, "explanation": "uzasadnienie, min. 50 znaków"}"#;

const MONTH_NAMES: [&str; 12] = [
    "styczeń",
    "luty",
    "marzec",
    "kwiecień",
    "maj",
    "czerwiec",
    "lipiec",
    "sierpień",
    "wrzesień",
    "październik",
    "listopad",
    "grudzień",
];

const COMPASS: [&str; 8] = [
    "północ",
    "północny wschód",
    "wschód",
    "południowy wschód",
    "południe",
    "południowy zachód",
    "zachód",
    "północny zachód",
];

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Clean user-supplied text before it is embedded in a prompt.
///
/// Drops markup and template characters and control characters, collapses
/// whitespace, and caps the length at [`MAX_QUERY_CHARS`].
#[must_use]
pub fn sanitize_user_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | '"') && !c.is_control())
        .collect();
    let capped: String = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect();
    capped.trim_end().to_string()
}

/// Format a number with a pl-PL decimal comma.
#[must_use]
pub fn format_decimal(value: f64, digits: usize) -> String {
    let formatted = format!("{value:.digits$}");
    let is_zero = formatted.trim_start_matches('-').chars().all(|c| c == '0' || c == '.');
    let formatted = if is_zero {
        formatted.trim_start_matches('-').to_string()
    } else {
        formatted
    };
    formatted.replace('.', ",")
}

/// Normalized 0–100 temperature to °C (0 ↔ −30 °C, 100 ↔ +50 °C).
#[must_use]
pub fn normalized_to_celsius(value: f64) -> f64 {
    value * 0.8 - 30.0
}

/// Normalized 0–100 sunlight to hours per day (100 ↔ 16 h).
#[must_use]
pub fn normalized_to_sun_hours(value: f64) -> f64 {
    value * 0.16
}

/// Normalized 0–100 precipitation to mm per month (100 ↔ 300 mm).
#[must_use]
pub fn normalized_to_precipitation_mm(value: f64) -> f64 {
    value * 3.0
}

/// Polish name of the eight-point compass direction for `degrees`.
#[must_use]
pub fn compass_direction(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = ((normalized + 22.5) / 45.0) as usize % COMPASS.len();
    COMPASS[index]
}

/// Polish month name for a 1-based month number.
#[must_use]
pub fn month_name(month: u8) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[usize::from(month - 1)],
        _ => "?",
    }
}

/// Which half of the globe the garden is in; decides the growing season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Northern,
    Southern,
}

impl Hemisphere {
    /// The equator counts as northern.
    #[must_use]
    pub fn from_latitude(latitude: f64) -> Self {
        if latitude < 0.0 { Self::Southern } else { Self::Northern }
    }

    /// The six calendar months that weigh double, in season order.
    #[must_use]
    pub fn growing_months(self) -> [u8; 6] {
        match self {
            Self::Northern => [4, 5, 6, 7, 8, 9],
            Self::Southern => [10, 11, 12, 1, 2, 3],
        }
    }

    /// The other six months, in season order.
    #[must_use]
    pub fn dormant_months(self) -> [u8; 6] {
        match self {
            Self::Northern => [10, 11, 12, 1, 2, 3],
            Self::Southern => [4, 5, 6, 7, 8, 9],
        }
    }

    #[must_use]
    pub fn is_growing_month(self, month: u8) -> bool {
        self.growing_months().contains(&month)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Northern => "półkula północna",
            Self::Southern => "półkula południowa",
        }
    }
}

/// Build the search prompt for a raw user query.
#[must_use]
pub fn search_prompt(query: &str) -> Prompt {
    let query = sanitize_user_text(query);
    Prompt {
        system: SEARCH_SYSTEM.to_string(),
        user: render_template(SEARCH_USER, &[("query", &query)]),
    }
}

/// Build the fit-scoring prompt for a placement.
#[must_use]
pub fn fit_prompt(ctx: &FitContext) -> Prompt {
    let hemisphere = Hemisphere::from_latitude(ctx.location.latitude);
    let system = render_template(
        FIT_SYSTEM,
        &[
            ("hemisphere", hemisphere.label()),
            ("growing_months", &month_list(&hemisphere.growing_months())),
            ("dormant_months", &month_list(&hemisphere.dormant_months())),
        ],
    );

    let user = render_template(
        FIT_USER,
        &[
            ("plant_name", &sanitize_user_text(&ctx.plant_name)),
            ("location_lines", &location_lines(ctx)),
            ("climate_lines", &climate_lines(ctx)),
            ("cell_lines", &cell_lines(ctx)),
            ("monthly_lines", &monthly_lines(&ctx.monthly_weather, hemisphere)),
        ],
    );

    Prompt { system, user }
}

fn month_list(months: &[u8]) -> String {
    months.iter().map(|m| month_name(*m)).collect::<Vec<_>>().join(", ")
}

fn location_lines(ctx: &FitContext) -> String {
    let loc = &ctx.location;
    let lat_hemi = if loc.latitude < 0.0 { "S" } else { "N" };
    let lon_hemi = if loc.longitude < 0.0 { "W" } else { "E" };
    let mut lines = vec![format!(
        "- Współrzędne: {}° {lat_hemi}, {}° {lon_hemi}",
        format_decimal(loc.latitude.abs(), 4),
        format_decimal(loc.longitude.abs(), 4),
    )];
    if let Some(address) = loc.address.as_deref().map(sanitize_user_text).filter(|a| !a.is_empty()) {
        lines.push(format!("- Adres: {address}"));
    }
    if let Some(zone) = loc.climate_zone.as_deref().map(sanitize_user_text).filter(|z| !z.is_empty()) {
        lines.push(format!("- Strefa klimatyczna: {zone}"));
    }
    let orientation = ctx.orientation_deg.rem_euclid(360.0);
    lines.push(format!(
        "- Orientacja działki: {}° ({})",
        format_decimal(orientation, 0),
        compass_direction(orientation),
    ));
    lines.join("\n")
}

fn climate_lines(ctx: &FitContext) -> String {
    let climate = &ctx.climate;
    let mut lines = vec![
        format!("- Średnia temperatura: {} °C", format_decimal(climate.mean_temperature_c, 1)),
        format!("- Suma opadów: {} mm", format_decimal(climate.annual_precipitation_mm, 0)),
    ];
    if let Some(days) = climate.frost_free_days {
        lines.push(format!("- Dni bez przymrozków: {days}"));
    }
    lines.join("\n")
}

fn cell_lines(ctx: &FitContext) -> String {
    let sunlight = ctx.cell.sunlight_hours.map_or_else(
        || "brak danych".to_string(),
        |h| format!("{} h/dzień", format_decimal(h, 1)),
    );
    format!(
        "- Komórka: ({}, {})\n- Szacowane nasłonecznienie: {sunlight}",
        ctx.cell.x, ctx.cell.y
    )
}

fn monthly_lines(weather: &[MonthlyWeather], hemisphere: Hemisphere) -> String {
    if weather.is_empty() {
        return "- brak danych".to_string();
    }
    weather
        .iter()
        .map(|w| {
            let weight = if hemisphere.is_growing_month(w.month) {
                "sezon wegetacyjny, waga 2"
            } else {
                "waga 1"
            };
            format!(
                "- {} ({weight}): temperatura {} °C, nasłonecznienie {} h/dzień, wilgotność {}%, opady {} mm",
                month_name(w.month),
                format_decimal(normalized_to_celsius(w.temperature), 1),
                format_decimal(normalized_to_sun_hours(w.sunlight), 1),
                format_decimal(w.humidity, 0),
                format_decimal(normalized_to_precipitation_mm(w.precipitation), 0),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnualClimate, CellPosition, Location};

    fn context(latitude: f64) -> FitContext {
        FitContext {
            plant_name: "Lawenda wąskolistna".into(),
            location: Location {
                latitude,
                longitude: 21.0122,
                address: Some("ul. Ogrodowa 5, Warszawa".into()),
                climate_zone: Some("6b".into()),
            },
            orientation_deg: 180.0,
            climate: AnnualClimate {
                mean_temperature_c: 8.5,
                annual_precipitation_mm: 550.0,
                frost_free_days: Some(190),
            },
            cell: CellPosition { x: 3, y: 4, sunlight_hours: Some(6.5) },
            monthly_weather: vec![
                MonthlyWeather { month: 1, temperature: 35.0, sunlight: 12.5, humidity: 85.0, precipitation: 10.0 },
                MonthlyWeather { month: 7, temperature: 62.5, sunlight: 50.0, humidity: 65.0, precipitation: 25.0 },
            ],
        }
    }

    #[test]
    fn template_rendering_works() {
        let rendered = render_template("Hello {name}, {unknown}.", &[("name", "Goran")]);
        assert_eq!(rendered, "Hello Goran, {unknown}.");
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(format_decimal(8.54, 1), "8,5");
        assert_eq!(format_decimal(550.0, 0), "550");
        assert_eq!(format_decimal(-3.25, 2), "-3,25");
        assert_eq!(format_decimal(-0.04, 1), "0,0");
    }

    #[test]
    fn normalized_values_convert_to_units() {
        assert!((normalized_to_celsius(62.5) - 20.0).abs() < 1e-9);
        assert!((normalized_to_celsius(0.0) + 30.0).abs() < 1e-9);
        assert!((normalized_to_sun_hours(50.0) - 8.0).abs() < 1e-9);
        assert!((normalized_to_precipitation_mm(25.0) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn compass_directions() {
        assert_eq!(compass_direction(0.0), "północ");
        assert_eq!(compass_direction(359.0), "północ");
        assert_eq!(compass_direction(90.0), "wschód");
        assert_eq!(compass_direction(180.0), "południe");
        assert_eq!(compass_direction(-90.0), "zachód");
        assert_eq!(compass_direction(225.0), "południowy zachód");
    }

    #[test]
    fn month_names_are_one_based() {
        assert_eq!(month_name(1), "styczeń");
        assert_eq!(month_name(12), "grudzień");
        assert_eq!(month_name(0), "?");
        assert_eq!(month_name(13), "?");
    }

    #[test]
    fn sanitize_strips_markup_and_caps_length() {
        assert_eq!(sanitize_user_text("  <b>róża</b>\n  {x} "), "bróża/b x");
        assert_eq!(sanitize_user_text(&"a".repeat(300)).chars().count(), MAX_QUERY_CHARS);
        let cut_at_space = format!("{} tail", "a".repeat(MAX_QUERY_CHARS - 1));
        assert_eq!(sanitize_user_text(&cut_at_space), "a".repeat(MAX_QUERY_CHARS - 1));
    }

    #[test]
    fn hemisphere_flips_growing_season() {
        assert_eq!(Hemisphere::from_latitude(52.0), Hemisphere::Northern);
        assert_eq!(Hemisphere::from_latitude(0.0), Hemisphere::Northern);
        assert_eq!(Hemisphere::from_latitude(-33.9), Hemisphere::Southern);
        assert!(Hemisphere::Northern.is_growing_month(7));
        assert!(!Hemisphere::Northern.is_growing_month(1));
        assert!(Hemisphere::Southern.is_growing_month(1));
        assert!(!Hemisphere::Southern.is_growing_month(7));
    }

    #[test]
    fn search_prompt_embeds_sanitized_query() {
        let prompt = search_prompt("  <script>lawenda  ");
        assert!(prompt.system.contains("od 1 do 5"));
        assert!(prompt.user.contains("\"scriptlawenda\""));
        assert!(!prompt.user.contains("{query}"));
    }

    #[test]
    fn fit_prompt_renders_units_and_weights() {
        let prompt = fit_prompt(&context(52.2297));
        assert!(prompt.system.contains("półkula północna"));
        assert!(prompt.system.contains("kwiecień, maj, czerwiec, lipiec, sierpień, wrzesień"));
        assert!(prompt.user.contains("Roślina: Lawenda wąskolistna"));
        assert!(prompt.user.contains("52,2297° N, 21,0122° E"));
        assert!(prompt.user.contains("180° (południe)"));
        assert!(prompt.user.contains("Strefa klimatyczna: 6b"));
        assert!(prompt.user.contains("Średnia temperatura: 8,5 °C"));
        assert!(prompt.user.contains("Dni bez przymrozków: 190"));
        assert!(prompt.user.contains("Szacowane nasłonecznienie: 6,5 h/dzień"));
        assert!(prompt.user.contains(
            "- lipiec (sezon wegetacyjny, waga 2): temperatura 20,0 °C, nasłonecznienie 8,0 h/dzień, wilgotność 65%, opady 75 mm"
        ));
        assert!(prompt.user.contains("- styczeń (waga 1): temperatura -2,0 °C"));
        assert!(!prompt.user.contains("{monthly_lines}"));
    }

    #[test]
    fn fit_prompt_southern_hemisphere() {
        let prompt = fit_prompt(&context(-33.9));
        assert!(prompt.system.contains("półkula południowa"));
        assert!(prompt.user.contains("33,9000° S"));
        assert!(prompt.user.contains("- styczeń (sezon wegetacyjny, waga 2)"));
        assert!(prompt.user.contains("- lipiec (waga 1)"));
    }

    #[test]
    fn fit_prompt_without_optional_data() {
        let mut ctx = context(50.0);
        ctx.location.address = None;
        ctx.location.climate_zone = None;
        ctx.climate.frost_free_days = None;
        ctx.cell.sunlight_hours = None;
        ctx.monthly_weather.clear();
        let prompt = fit_prompt(&ctx);
        assert!(!prompt.user.contains("Adres"));
        assert!(!prompt.user.contains("przymrozków"));
        assert!(prompt.user.contains("Szacowane nasłonecznienie: brak danych"));
        assert!(prompt.user.contains("DANE MIESIĘCZNE:\n- brak danych"));
    }
}
