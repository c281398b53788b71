/// Output modes are compatible when either side is unconstrained or they share a mode.
pub fn are_modalities_compatible<S: AsRef<str>, C: AsRef<str>>(
    server_output_modes: Option<&[S]>,
    client_output_modes: Option<&[C]>,
) -> bool {
    let (Some(server), Some(client)) = (server_output_modes, client_output_modes) else {
        return true;
    };
    if server.is_empty() || client.is_empty() {
        return true;
    }
    client.iter().any(|mode| server.iter().any(|s| s.as_ref() == mode.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_sides_are_compatible() {
        let modes = ["text".to_string()];
        assert!(are_modalities_compatible::<&str, _>(None, Some(&modes[..])));
        assert!(are_modalities_compatible::<_, &str>(Some(&modes[..]), None));
        assert!(are_modalities_compatible::<&str, _>(Some(&[]), Some(&modes[..])));
    }

    #[test]
    fn intersection_decides() {
        let server = ["text", "text/plain"];
        assert!(are_modalities_compatible(Some(&server[..]), Some(&["text/plain"][..])));
        assert!(!are_modalities_compatible(Some(&server[..]), Some(&["image/png"][..])));
    }
}
