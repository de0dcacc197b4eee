use anyhow::{Context, Result};

/// Who reads a given conversation part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Announcer,
    Male,
    Female,
}

/// VOICEVOX speaker IDs by voice role. The announcer doubles as the first
/// male voice, matching the server's stock voices.
const MALE_VOICES: &[u32] = &[1, 6, 2];
const FEMALE_VOICES: &[u32] = &[3, 4, 7];
const ANNOUNCER_VOICE: u32 = 1;

/// Client for a local VOICEVOX server (text to WAV in two steps:
/// audio_query, then synthesis).
#[derive(Debug, Clone)]
pub struct VoicevoxClient {
    client: reqwest::Client,
    base_url: String,
}

impl VoicevoxClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// VOICEVOX speaker ID for the given role
    pub fn speaker_id(speaker: Speaker) -> u32 {
        match speaker {
            Speaker::Male => MALE_VOICES[0],
            Speaker::Female => FEMALE_VOICES[0],
            Speaker::Announcer => ANNOUNCER_VOICE,
        }
    }

    /// Probe whether the server is reachable
    pub async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/version", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Synthesize one part of speech, returning WAV bytes
    pub async fn synthesize(&self, text: &str, speaker: Speaker) -> Result<Vec<u8>> {
        let speaker_id = Self::speaker_id(speaker).to_string();

        // Generate the audio query from the text
        let query_response = self
            .client
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", text), ("speaker", speaker_id.as_str())])
            .send()
            .await
            .context("Failed to reach VOICEVOX audio_query")?;

        if !query_response.status().is_success() {
            anyhow::bail!("VOICEVOX audio_query error: {}", query_response.status());
        }

        let query: serde_json::Value = query_response
            .json()
            .await
            .context("Failed to parse VOICEVOX audio query")?;

        // Synthesize speech from the query
        let synthesis_response = self
            .client
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", speaker_id.as_str())])
            .json(&query)
            .send()
            .await
            .context("Failed to reach VOICEVOX synthesis")?;

        if !synthesis_response.status().is_success() {
            anyhow::bail!("VOICEVOX synthesis error: {}", synthesis_response.status());
        }

        let bytes = synthesis_response
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_ids_map_to_voice_table() {
        assert_eq!(VoicevoxClient::speaker_id(Speaker::Male), MALE_VOICES[0]);
        assert_eq!(VoicevoxClient::speaker_id(Speaker::Female), FEMALE_VOICES[0]);
        assert_eq!(VoicevoxClient::speaker_id(Speaker::Announcer), ANNOUNCER_VOICE);
    }
}
