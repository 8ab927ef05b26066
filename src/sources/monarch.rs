use std::borrow::Cow;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::MappingError;
use crate::mapping::Category;
use crate::mapping::builder::{CategoryPage, CategoryPageSource, CategoryRecord};
use crate::utils::serde::StringOrVec;

pub(crate) const MONARCH_BASE: &str = "https://api-v3.monarchinitiative.org";
pub(crate) const MONARCH_BASE_ENV: &str = "MONARCH_OMIM_MONARCH_BASE";
const MONARCH_API: &str = "monarch";
const MONARCH_MAX_LIMIT: usize = 500;

pub struct MonarchClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl MonarchClient {
    pub fn new() -> Result<Self, MappingError> {
        Ok(Self {
            client: crate::sources::crawl_client()?,
            base: crate::sources::env_base(MONARCH_BASE, MONARCH_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, MappingError> {
        Ok(Self {
            client: crate::sources::crawl_client()?,
            base: Cow::Owned(base),
        })
    }

    pub fn base(&self) -> &str {
        self.base.as_ref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<T, MappingError> {
        let resp = req.send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, MONARCH_API).await?;

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(MappingError::Api {
                api: MONARCH_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        crate::sources::ensure_json_content_type(MONARCH_API, content_type.as_ref(), &bytes)?;

        serde_json::from_slice(&bytes).map_err(|source| MappingError::ApiJson {
            api: MONARCH_API.to_string(),
            source,
        })
    }

    /// One page of `/v3/api/search` restricted to a biolink category.
    pub async fn search_category(
        &self,
        category: Category,
        limit: usize,
        offset: usize,
    ) -> Result<MonarchSearchResponse, MappingError> {
        let limit = limit.clamp(1, MONARCH_MAX_LIMIT);
        let url = self.endpoint("v3/api/search");
        let req = self.client.get(&url).query(&[
            ("category", category.biolink()),
            ("limit", &limit.to_string()),
            ("offset", &offset.to_string()),
        ]);
        self.get_json(req).await
    }
}

#[async_trait::async_trait]
impl CategoryPageSource for MonarchClient {
    async fn fetch_page(
        &self,
        category: Category,
        offset: usize,
        limit: usize,
    ) -> Result<CategoryPage, MappingError> {
        let resp = self.search_category(category, limit, offset).await?;
        Ok(CategoryPage {
            total: resp.total,
            records: resp
                .items
                .into_iter()
                .map(|item| CategoryRecord {
                    id: item.id,
                    name: item.name,
                    xrefs: item.xref.into_vec(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonarchSearchResponse {
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub items: Vec<MonarchSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonarchSearchItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub xref: StringOrVec,
}
