// Human-readable durations ("500ms", "15s", "14days") as used by Hermes config files

use serde::{de, Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timed {
        #[serde(with = "super")]
        delay: Duration,
    }

    #[test]
    fn test_hermes_duration_formats() {
        let cases = [
            (Duration::from_millis(500), "500ms"),
            (Duration::from_secs(15), "15s"),
            (Duration::from_secs(14 * 24 * 60 * 60), "14days"),
        ];

        for (duration, text) in cases {
            let encoded = toml::to_string(&Timed { delay: duration }).unwrap();
            assert_eq!(encoded.trim(), format!("delay = \"{}\"", text));

            let decoded: Timed = toml::from_str(&encoded).unwrap();
            assert_eq!(decoded.delay, duration);
        }
    }

    #[test]
    fn test_rejects_unitless_duration() {
        let result: Result<Timed, _> = toml::from_str("delay = \"15\"");
        assert!(result.is_err());
    }
}
