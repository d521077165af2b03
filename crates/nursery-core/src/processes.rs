//! Static process-configuration table.
//!
//! Each nursery process tracks an ordered list of inspected parameters.
//! The table is read-only input to ingestion and aggregation.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identifier of the overview entry; never ingested or averaged.
pub const OVERVIEW: &str = "Visão Geral";

/// Identifier of the administration entry; never ingested or averaged.
pub const ADMINISTRATION: &str = "Administração";

/// Identifiers that carry no parameters of their own.
pub const RESERVED_PROCESSES: &[&str] = &[OVERVIEW, ADMINISTRATION];

/// `true` for the overview and administration entries.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PROCESSES.contains(&name)
}

/// A named process plus the parameter columns it tracks, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ProcessDefinition {
    pub fn new(name: &str, parameters: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved(&self.name)
    }

    pub fn has_parameter(&self, parameter: &str) -> bool {
        self.parameters.iter().any(|p| p == parameter)
    }
}

/// Ordered process table. Iteration order is significant: the sheet matcher
/// picks the first process that matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessConfig {
    processes: Vec<ProcessDefinition>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::nursery()
    }
}

impl ProcessConfig {
    pub fn new(processes: Vec<ProcessDefinition>) -> Self {
        Self { processes }
    }

    /// The built-in nursery table, reserved entries first.
    pub fn nursery() -> Self {
        Self::new(vec![
            ProcessDefinition::new(OVERVIEW, &[]),
            ProcessDefinition::new(ADMINISTRATION, &[]),
            ProcessDefinition::new("Adubação", &["Adubação Minijardim", "Adubação plataformas"]),
            ProcessDefinition::new(
                "Casa de vegetação",
                &[
                    "Idade das estacas na casa (dias) (Climatização)",
                    "Temperatura °C",
                    "Umidade %",
                    "Pontos com aspersores danificados",
                    "Pedilúvio está com solução de hipoclorito",
                    "Pragas e doenças",
                    "Aplicação de fungicida e bactericida",
                ],
            ),
            ProcessDefinition::new(
                "Casa de vegetação - Sobrevivência",
                &["Idade da muda (dias)", "% de sobrevivência"],
            ),
            ProcessDefinition::new("Enchimento de Bandejas - Limpeza", &["Caixa de Assepsia"]),
            ProcessDefinition::new(
                "Estaqueamento",
                &[
                    "Estaca fora do centro",
                    "Profundidade fora do padrão",
                    "Plantio fora da angulação correta",
                    "Estaca verde",
                    "Tamanho fora do padrão",
                    "Corte fora do padrão",
                    "Folha aterrada",
                ],
            ),
            ProcessDefinition::new(
                "Expedição",
                &[
                    "Altura da muda",
                    "Problemas de sanidade da parte aérea",
                    "Mudas com menos de 3 pares de folha",
                    "Substrato sem consistência",
                    "Ausência de raízes ativas",
                    "Mudas não-rustificadas",
                    "Mudas bifurcadas",
                    "Mudas quebradas",
                    "Tortuosidade < 45°",
                    "Diâmetro de coleto >=2mm",
                ],
            ),
            ProcessDefinition::new(
                "Formar Minijardim",
                &["Qualidade das cepas", "% de sobrevivência"],
            ),
            ProcessDefinition::new(
                "Irrigação",
                &["Irrigação Minijardim", "Irrigação plataformas"],
            ),
            ProcessDefinition::new(
                "Manejo Minijardim",
                &[
                    "Presença de Matocompetição",
                    "Presença de Doença/Pragas",
                    "Tamanho das estacas despadronizadas para coleta",
                    "Falha na Fertirrigação",
                ],
            ),
            ProcessDefinition::new(
                "Seleção de mudas - 1",
                &[
                    "Padronização de Tamanho",
                    "Mistura de Material",
                    "Controle de pragas e doenças",
                ],
            ),
            ProcessDefinition::new("Transporte de estacas/mudas - CV", &["% de aproveitamento"]),
        ])
    }

    /// Load a custom table from a JSON array of `{ "name", "parameters" }`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DashboardError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ProcessConfig = serde_json::from_str(&content)?;
        if config.processes.is_empty() {
            return Err(DashboardError::Config(format!(
                "process table {} is empty",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Every entry, reserved ones included, in configured order.
    pub fn all(&self) -> &[ProcessDefinition] {
        &self.processes
    }

    /// Entries that can receive records, in configured order.
    pub fn trackable(&self) -> impl Iterator<Item = &ProcessDefinition> {
        self.processes.iter().filter(|p| !p.is_reserved())
    }

    pub fn get(&self, name: &str) -> Option<&ProcessDefinition> {
        self.processes.iter().find(|p| p.name == name)
    }

    /// Like [`get`](Self::get), but reports unknown names as an error.
    pub fn require(&self, name: &str) -> Result<&ProcessDefinition> {
        self.get(name)
            .ok_or_else(|| DashboardError::UnknownProcess(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
