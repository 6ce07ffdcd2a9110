use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_pipeline();
        self.apply_env_overrides_gateway();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("REPOLENS_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid REPOLENS_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("REPOLENS_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("REPOLENS_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) =
            std::env::var("REPOLENS_OPENAI_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.llm.api_key = Some(v);
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("REPOLENS_GENERATION_TEMPERATURE") {
            match v.parse::<f32>() {
                Ok(t) => self.generation.temperature = t,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_GENERATION_TEMPERATURE: {v}"),
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_GENERATION_MAX_TOKENS") {
            match v.parse::<u32>() {
                Ok(n) => self.generation.max_tokens = n,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_GENERATION_MAX_TOKENS: {v}"),
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_TIMEOUT_GENERATION") {
            match v.parse::<u64>() {
                Ok(secs) => self.timeouts.generation_seconds = secs,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_TIMEOUT_GENERATION: {v}"),
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_RETRIEVAL_TOP_K") {
            match v.parse::<usize>() {
                Ok(k) => self.retrieval.top_k = k,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_RETRIEVAL_TOP_K: {v}"),
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_RETRIEVAL_MAX_CONTEXT_CHARS") {
            match v.parse::<usize>() {
                Ok(n) => self.retrieval.max_context_chars = Some(n),
                Err(_) => {
                    tracing::warn!("ignoring invalid REPOLENS_RETRIEVAL_MAX_CONTEXT_CHARS: {v}");
                }
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_EMBED_BATCH_SIZE") {
            match v.parse::<usize>() {
                Ok(n) => self.retrieval.embed_batch_size = n,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_EMBED_BATCH_SIZE: {v}"),
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_REGISTRY_IDLE_TTL") {
            match v.parse::<u64>() {
                Ok(secs) => self.registry.idle_ttl_seconds = secs,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_REGISTRY_IDLE_TTL: {v}"),
            }
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("REPOLENS_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("REPOLENS_GATEWAY_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("ignoring invalid REPOLENS_GATEWAY_PORT: {v}"),
            }
        }
        if let Ok(v) = std::env::var("REPOLENS_GATEWAY_TOKEN") {
            self.gateway.auth_token = Some(v);
        }
    }
}
