use crate::models::character::{Race, ServerInfo};
use std::collections::HashMap;

const ELYOS_SERVERS: [(u32, &str); 21] = [
    (1001, "시엘"), (1002, "네자칸"), (1003, "바이젤"), (1004, "카이시넬"),
    (1005, "유스티엘"), (1006, "아리엘"), (1007, "프레기온"), (1008, "메스람타에다"),
    (1009, "히타니에"), (1010, "나니아"), (1011, "타하바타"), (1012, "루터스"),
    (1013, "페르노스"), (1014, "다미누"), (1015, "카사카"), (1016, "바카르마"),
    (1017, "챈가룽"), (1018, "코치룽"), (1019, "이슈타르"), (1020, "티아마트"),
    (1021, "포에타"),
];

const ASMODIAN_SERVERS: [(u32, &str); 21] = [
    (2001, "이스라펠"), (2002, "지켈"), (2003, "트리니엘"), (2004, "루미엘"),
    (2005, "마르쿠탄"), (2006, "아스펠"), (2007, "에레슈키갈"), (2008, "브리트라"),
    (2009, "네몬"), (2010, "하달"), (2011, "루드라"), (2012, "울고른"),
    (2013, "무닌"), (2014, "오다르"), (2015, "젠카카"), (2016, "크로메데"),
    (2017, "콰이링"), (2018, "바바룽"), (2019, "파프니르"), (2020, "인드나흐"),
    (2021, "이스할겐"),
];

/// Known OCR confusions in the party bar. 스/슈 are routinely swapped, so
/// "이스" may also denote 이슈타르.
const OCR_CORRECTIONS: [(&str, &[&str]); 3] = [
    ("이스", &["이스라펠", "이스할겐", "이슈타르"]),
    ("이슈", &["이슈타르", "이스라펠", "이스할겐"]),
    ("바이첼", &["바이젤"]),
];

/// Minimum abbreviation length considered for prefix expansion
const MIN_PREFIX_CHARS: usize = 2;

/// Server list plus the static abbreviation table used to expand the
/// truncated server names rendered in the party bar.
#[derive(Debug, Clone)]
pub struct ServerDirectory {
    servers: Vec<ServerInfo>,
    corrections: HashMap<String, Vec<String>>,
}

impl ServerDirectory {
    /// Directory without correction entries
    pub fn new(servers: Vec<ServerInfo>) -> Self {
        Self {
            servers,
            corrections: HashMap::new(),
        }
    }

    /// Register an explicit abbreviation → servers entry
    pub fn with_correction(mut self, abbreviation: &str, servers: &[&str]) -> Self {
        self.corrections.insert(
            abbreviation.to_string(),
            servers.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn servers(&self) -> &[ServerInfo] {
        &self.servers
    }

    pub fn get(&self, name: &str) -> Option<&ServerInfo> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn server_id(&self, name: &str) -> Option<u32> {
        self.get(name).map(|s| s.id)
    }

    /// Expand an abbreviation into every full server name it could denote.
    ///
    /// Exact names win, then explicit corrections, then prefixes. Anything
    /// else comes back verbatim as a single unresolved entry.
    pub fn possible_servers(&self, abbreviation: &str) -> Vec<String> {
        if self.get(abbreviation).is_some() {
            return vec![abbreviation.to_string()];
        }

        if let Some(servers) = self.corrections.get(abbreviation) {
            return servers.clone();
        }

        if abbreviation.chars().count() >= MIN_PREFIX_CHARS {
            let matches: Vec<String> = self
                .servers
                .iter()
                .filter(|s| s.name.starts_with(abbreviation))
                .map(|s| s.name.clone())
                .collect();

            if !matches.is_empty() {
                return matches;
            }
        }

        vec![abbreviation.to_string()]
    }

    /// Whether the abbreviation maps to at least one known server
    pub fn is_known(&self, abbreviation: &str) -> bool {
        self.possible_servers(abbreviation)
            .iter()
            .any(|s| self.get(s).is_some())
    }
}

impl Default for ServerDirectory {
    fn default() -> Self {
        let servers = ELYOS_SERVERS
            .iter()
            .map(|(id, name)| ServerInfo::new(*id, name, Race::Elyos))
            .chain(
                ASMODIAN_SERVERS
                    .iter()
                    .map(|(id, name)| ServerInfo::new(*id, name, Race::Asmodian)),
            )
            .collect();

        OCR_CORRECTIONS
            .iter()
            .fold(Self::new(servers), |dir, (abbr, servers)| {
                dir.with_correction(abbr, servers)
            })
    }
}
