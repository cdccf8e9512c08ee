use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// 자체 발광 재질에서 오는 빛만 모으는 경로 추적
    PathTraced,
    /// 고정된 방향광 + 거칠기로 흔든 거울 반사
    DirectLight,
}

impl Shading {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "path" | "path_traced" | "pathtraced" => Some(Self::PathTraced),
            "direct" | "direct_light" | "directlight" => Some(Self::DirectLight),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PathTraced => "Path traced",
            Self::DirectLight => "Direct light",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub accumulate: bool,
    pub sky_light: bool,
    pub bounces: u32,
    pub shading: Shading,
    /// 픽셀마다 난수 생성기를 만들 때 섞는 값
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accumulate: true,
            sky_light: true,
            bounces: 5,
            shading: Shading::PathTraced,
            seed: 0,
        }
    }
}

impl Settings {
    /// EMBER_ACCUMULATE, EMBER_SKY_LIGHT, EMBER_BOUNCES, EMBER_SHADING, EMBER_SEED
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 읽을 수 없는 값은 경고만 남기고 기본값 유지
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup("EMBER_ACCUMULATE") {
            match parse_bool(&raw) {
                Some(value) => settings.accumulate = value,
                None => log::warn!("EMBER_ACCUMULATE: '{raw}' is not a boolean"),
            }
        }
        if let Some(raw) = lookup("EMBER_SKY_LIGHT") {
            match parse_bool(&raw) {
                Some(value) => settings.sky_light = value,
                None => log::warn!("EMBER_SKY_LIGHT: '{raw}' is not a boolean"),
            }
        }
        if let Some(raw) = lookup("EMBER_BOUNCES") {
            match raw.trim().parse::<u32>() {
                Ok(value) => settings.bounces = value,
                Err(error) => log::warn!("EMBER_BOUNCES: '{raw}' ({error})"),
            }
        }
        if let Some(raw) = lookup("EMBER_SHADING") {
            match Shading::parse(&raw) {
                Some(value) => settings.shading = value,
                None => log::warn!("EMBER_SHADING: expected 'path' or 'direct', got '{raw}'"),
            }
        }
        if let Some(raw) = lookup("EMBER_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(value) => settings.seed = value,
                Err(error) => log::warn!("EMBER_SEED: '{raw}' ({error})"),
            }
        }

        settings
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
