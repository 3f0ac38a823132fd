#![no_main]

use libfuzzer_sys::fuzz_target;
use salvo::config::types::ConfigFile;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let parsed: Option<ConfigFile> = toml::from_str(input).ok();
        let applied = salvo::fuzzing::apply_config_from_toml(input);
        if applied.is_ok()
            && let Some(config) = parsed
        {
            debug_assert!(!(config.requests.is_some() && config.duration.is_some()));
            debug_assert!(!(config.data.is_some() && config.data_file.is_some()));
            if let Some(concurrency) = config.concurrency {
                debug_assert!(concurrency >= 1);
            }
        }
    }
});
