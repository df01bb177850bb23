//! Extraction prompt rendering
//!
//! A prompt is a pure function of the template, the chunk text and the
//! chunk's position, so prompts can be snapshot-tested without a model.

/// Placeholder replaced with the verbatim chunk text
pub const CHUNK_PLACEHOLDER: &str = "{{chunk}}";

/// Placeholder replaced with the chunk's position label
pub const POSITION_PLACEHOLDER: &str = "{{position}}";

/// Where a chunk sits within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPosition {
    /// Zero-based chunk index
    pub index: usize,
    /// Total chunks in the document
    pub total: usize,
}

impl ChunkPosition {
    /// One-based label, e.g. `Parte 2 de 5`
    pub fn label(&self) -> String {
        format!("Parte {} de {}", self.index + 1, self.total)
    }
}

/// Renders chunks into extraction instructions
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    /// Builder using the built-in clinical extraction template
    pub fn new() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Builder using a custom template. The template should contain
    /// `{{chunk}}` and may contain `{{position}}`.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the instruction for one chunk
    pub fn build(&self, chunk_text: &str, position: ChunkPosition) -> String {
        // Chunk text goes in last so placeholders inside it stay literal
        self.template
            .replace(POSITION_PLACEHOLDER, &position.label())
            .replace(CHUNK_PLACEHOLDER, chunk_text)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

const DEFAULT_TEMPLATE: &str = r#"# INSTRUÇÃO
Você é uma automação clínica determinística responsável por extrair TAGS CLÍNICAS interpretáveis a partir de protocolos médicos.
NÃO ATUE COMO UM ASSISTENTE.
NÃO ESCREVA COMENTÁRIOS, EXPLICAÇÕES OU FRASES.
A SAÍDA DEVE SER APENAS UM ARRAY JSON VÁLIDO, PRONTO PARA INSERÇÃO EM BANCO DE DADOS.

---

Uma TAG clínica representa uma condição interpretável que pode ser atribuída a um paciente, por exemplo:
- "hipotensao"
- "temperatura_anormal"
- "sepse_suspeita"
- "disfuncao_renal_aguda"

NÃO extraia nomes de campos ou sinais vitais como tags. "temperatura", "PAS", "FC" e "creatinina" são campos: use-os apenas dentro de `conditions`, nunca como `name` da tag.

---

ESTRUTURA ESPERADA:

[
  {
    "name": "hipotensao",
    "display_name": "Hipotensão",
    "description": "Pressão arterial sistólica abaixo de 90 mmHg",
    "category": "sepse",
    "conditions": [
      {
        "type": "field",
        "name": "pressao_sistolica",
        "field_path": "vitals.pressao.sistolica",
        "operator": "<",
        "value": 90
      }
    ]
  }
]

Campos de cada condição em `conditions`:
- `type`: "field", "tag", "event" ou "natural_language"
- `name`: nome do campo, da tag ou do evento (obrigatório exceto para "natural_language")
- `field_path`, `operator` (<, >, <=, >=, ==, !=) e `value` numérico: somente quando `type` = "field"
- `status` e `time_relation`: somente quando `type` = "event"
- `expression`: texto livre, somente quando `type` = "natural_language"

Se o trecho não contiver nenhuma tag, responda [].
NÃO INCLUA NENHUM TEXTO FORA DO JSON.

---

PROTOCOLO CLÍNICO ({{position}}):
{{chunk}}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_label_is_one_based() {
        let position = ChunkPosition { index: 0, total: 3 };
        assert_eq!(position.label(), "Parte 1 de 3");
    }

    #[test]
    fn test_default_prompt_embeds_chunk_and_position() {
        let prompt = PromptBuilder::new().build(
            "PAS < 90 mmHg indica hipotensão.",
            ChunkPosition { index: 1, total: 4 },
        );

        assert!(prompt.contains("automação clínica determinística"));
        assert!(prompt.contains("\"conditions\""));
        assert!(prompt.contains("natural_language"));
        assert!(prompt.contains("PROTOCOLO CLÍNICO (Parte 2 de 4):\nPAS < 90 mmHg indica hipotensão."));
        assert!(!prompt.contains(CHUNK_PLACEHOLDER));
        assert!(!prompt.contains(POSITION_PLACEHOLDER));
    }

    #[test]
    fn test_build_is_pure() {
        let builder = PromptBuilder::new();
        let position = ChunkPosition { index: 0, total: 1 };
        assert_eq!(builder.build("texto", position), builder.build("texto", position));
    }

    #[test]
    fn test_placeholders_inside_chunk_stay_literal() {
        let builder = PromptBuilder::with_template("[{{position}}] {{chunk}}");
        let prompt = builder.build("literal {{position}}", ChunkPosition { index: 4, total: 5 });
        assert_eq!(prompt, "[Parte 5 de 5] literal {{position}}");
    }
}
