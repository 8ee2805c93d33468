//! User-Friendly Error Formatting
//!
//! Turns startup failures into a boxed message with likely causes and next
//! steps, so a clinician setting up a station does not have to read a
//! backtrace.

use std::fmt::Write;

/// Format an error for the console
///
/// The message is classified by its chain (configuration, device
/// connection, profile storage, scene layout) and the full chain is printed
/// under "Technical Details".
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(output).ok();
    writeln!(
        output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(output).ok();

    let chain = format!("{:#}", error);
    let lower = chain.to_lowercase();

    if lower.contains("scene") {
        format_scene_error(&mut output);
    } else if lower.contains("profile") {
        format_profile_error(&mut output);
    } else if lower.contains("websocket") || lower.contains("connect") || lower.contains("ws://")
    {
        format_connection_error(&mut output);
    } else if lower.contains("config") {
        format_config_error(&mut output);
    } else {
        format_generic_error(&mut output, &error.to_string());
    }

    writeln!(output).ok();
    writeln!(
        output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(output, "Technical Details:").ok();
    writeln!(output).ok();
    writeln!(output, "{}", chain).ok();
    writeln!(output).ok();
    writeln!(
        output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(output, "Need Help?").ok();
    writeln!(
        output,
        "  - Run with --verbose for detailed logs: motion-pointer -vv"
    )
    .ok();
    writeln!(output, "  - Print the effective config: motion-pointer --print-config").ok();
    writeln!(
        output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_connection_error(output: &mut String) {
    writeln!(output, "Device Hub Connection Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not reach the wearable hub's WebSocket endpoint.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Not joined to the hub's Wi-Fi network").ok();
    writeln!(output, "     → The default hub address is 192.168.4.1").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Wrong URL").ok();
    writeln!(output, "     → Check [transport] url in config.toml").ok();
    writeln!(output, "     → Or override: motion-pointer --url ws://HOST/ws").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Hub powered off or rebooting").ok();
    writeln!(output, "     → The client keeps retrying; power-cycle the hub").ok();
}

fn format_profile_error(output: &mut String) {
    writeln!(output, "Device Profile Error").ok();
    writeln!(output).ok();
    writeln!(output, "The saved device profiles could not be read or written.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Profile file edited by hand and no longer valid JSON").ok();
    writeln!(output, "     → Restore a backup or delete the file to start from defaults").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Directory not writable").ok();
    writeln!(output, "     → Check permissions, or set [profiles] path").ok();
}

fn format_scene_error(output: &mut String) {
    writeln!(output, "Scene Layout Error").ok();
    writeln!(output).ok();
    writeln!(output, "The interactive layout file given with --scene is unusable.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. File does not exist").ok();
    writeln!(output, "     → Check the path passed to --scene").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid layout JSON").ok();
    writeln!(output, "     → Every node needs id, tag and rect").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Value out of range").ok();
    writeln!(output, "     → render.fps must be 1-240").ok();
    writeln!(output, "     → interaction.dwell_ms must not be shorter than click_debounce_ms").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Same device named as arbitration primary and secondary").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Startup Error").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_formatting() {
        let error = anyhow::anyhow!("render.fps must be between 1 and 240")
            .context("Failed to load config");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("Configuration Error"));
        assert!(formatted.contains("render.fps"));
    }

    #[test]
    fn test_profile_error_formatting() {
        let error = anyhow::anyhow!("Failed to save profiles");
        assert!(format_user_error(&error).contains("Device Profile Error"));
    }

    #[test]
    fn test_connection_error_formatting() {
        let error = anyhow::anyhow!("WebSocket handshake failed");
        assert!(format_user_error(&error).contains("192.168.4.1"));
    }
}
