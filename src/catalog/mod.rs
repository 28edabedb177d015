//! Provider catalog.
//!
//! Static registry of every third-party integration the system knows how to
//! connect. Descriptors are pure data: OAuth endpoints, scopes, the names of
//! the environment variables holding client credentials (never the secrets
//! themselves), and per-provider protocol overrides. Adding a provider is a
//! catalog entry, not a code change in the orchestrator.

use std::sync::OnceLock;

/// How a provider wants client credentials presented during token exchange.
///
/// Most providers take `client_id`/`client_secret` in the form body. A few
/// (Notion) insist on HTTP Basic auth and reject body credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenAuthStyle {
    Body,
    BasicHeader,
}

/// Shape of the userinfo response for account-name extraction.
///
/// `Flat` responses carry the name/email at the top level. Notion wraps the
/// workspace owner in `bot.owner.user` when the token belongs to an
/// integration rather than a person.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityShape {
    Flat,
    NotionBot,
}

/// One catalog entry. Immutable after process start.
#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub icon: String,
    pub category: String,
    pub description: String,
    /// OAuth endpoints. Empty string means the capability is absent.
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
    /// Env var names holding the OAuth app credentials.
    pub client_id_env: String,
    pub client_secret_env: String,
    /// Provider-specific authorize-URL parameters (e.g. `access_type=offline`).
    pub extra_auth_params: Vec<(String, String)>,
    /// Whether a sync adapter exists for this provider.
    pub supports_sync: bool,
    pub token_auth: TokenAuthStyle,
    /// Fixed extra headers for userinfo calls (e.g. an API-version header).
    pub userinfo_headers: Vec<(String, String)>,
    pub identity_shape: IdentityShape,
}

impl ProviderDescriptor {
    pub fn new(
        id: &str,
        display_name: &str,
        icon: &str,
        category: &str,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            icon: icon.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            auth_url: String::new(),
            token_url: String::new(),
            userinfo_url: String::new(),
            scopes: Vec::new(),
            client_id_env: String::new(),
            client_secret_env: String::new(),
            extra_auth_params: Vec::new(),
            supports_sync: false,
            token_auth: TokenAuthStyle::Body,
            userinfo_headers: Vec::new(),
            identity_shape: IdentityShape::Flat,
        }
    }

    pub fn oauth(mut self, auth_url: &str, token_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.token_url = token_url.to_string();
        self
    }

    pub fn scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn client_env(mut self, id_env: &str, secret_env: &str) -> Self {
        self.client_id_env = id_env.to_string();
        self.client_secret_env = secret_env.to_string();
        self
    }

    pub fn userinfo(mut self, url: &str) -> Self {
        self.userinfo_url = url.to_string();
        self
    }

    pub fn extra_auth_params(mut self, params: &[(&str, &str)]) -> Self {
        self.extra_auth_params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn syncable(mut self) -> Self {
        self.supports_sync = true;
        self
    }

    pub fn token_auth(mut self, style: TokenAuthStyle) -> Self {
        self.token_auth = style;
        self
    }

    pub fn userinfo_header(mut self, name: &str, value: &str) -> Self {
        self.userinfo_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn identity_shape(mut self, shape: IdentityShape) -> Self {
        self.identity_shape = shape;
        self
    }
}

/// Looks up a provider by id.
pub fn get(id: &str) -> Option<&'static ProviderDescriptor> {
    all().iter().find(|p| p.id == id)
}

/// Returns every provider in insertion order. Stable across calls.
pub fn all() -> &'static [ProviderDescriptor] {
    static CATALOG: OnceLock<Vec<ProviderDescriptor>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

/// True iff both credential env vars resolve to non-empty values.
///
/// The synthetic `custom` entry is always considered configured since it
/// takes manually entered credentials instead of an OAuth app.
pub fn is_configured(provider: &ProviderDescriptor) -> bool {
    if provider.id == "custom" {
        return true;
    }
    if provider.client_id_env.is_empty() || provider.client_secret_env.is_empty() {
        return false;
    }
    let set = |name: &str| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);
    set(&provider.client_id_env) && set(&provider.client_secret_env)
}

/// True iff the provider has both OAuth endpoints defined.
pub fn supports_oauth(provider: &ProviderDescriptor) -> bool {
    !provider.auth_url.is_empty() && !provider.token_url.is_empty()
}

/// Distinct categories in first-seen order.
pub fn categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for p in all() {
        if !seen.contains(&p.category.as_str()) {
            seen.push(p.category.as_str());
        }
    }
    seen
}

fn build_catalog() -> Vec<ProviderDescriptor> {
    vec![
        // ── Productivity ──────────────────────────────────────────────
        ProviderDescriptor::new(
            "notion",
            "Notion",
            "https://cdn.simpleicons.org/notion/000000",
            "Productivity",
            "Connect your Notion workspace to sync pages and databases.",
        )
        .oauth(
            "https://api.notion.com/v1/oauth/authorize",
            "https://api.notion.com/v1/oauth/token",
        )
        .client_env("NOTION_OAUTH_CLIENT_ID", "NOTION_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.notion.com/v1/users/me")
        .extra_auth_params(&[("owner", "user")])
        .syncable()
        .token_auth(TokenAuthStyle::BasicHeader)
        .userinfo_header("Notion-Version", "2022-06-28")
        .identity_shape(IdentityShape::NotionBot),
        ProviderDescriptor::new(
            "google_drive",
            "Google Drive",
            "https://cdn.simpleicons.org/googledrive",
            "Productivity",
            "Access and sync files from Google Drive.",
        )
        .oauth(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )
        .scopes(&[
            "https://www.googleapis.com/auth/drive.readonly",
            "openid",
            "email",
            "profile",
        ])
        .client_env("GOOGLE_OAUTH_CLIENT_ID", "GOOGLE_OAUTH_CLIENT_SECRET")
        .userinfo("https://www.googleapis.com/oauth2/v2/userinfo")
        .extra_auth_params(&[("access_type", "offline"), ("prompt", "consent")]),
        ProviderDescriptor::new(
            "google_docs",
            "Google Docs",
            "https://cdn.simpleicons.org/googledocs",
            "Productivity",
            "Import content from Google Docs.",
        )
        .oauth(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )
        .scopes(&[
            "https://www.googleapis.com/auth/documents.readonly",
            "openid",
            "email",
            "profile",
        ])
        .client_env("GOOGLE_OAUTH_CLIENT_ID", "GOOGLE_OAUTH_CLIENT_SECRET")
        .userinfo("https://www.googleapis.com/oauth2/v2/userinfo")
        .extra_auth_params(&[("access_type", "offline"), ("prompt", "consent")]),
        ProviderDescriptor::new(
            "onedrive",
            "OneDrive",
            "https://cdn.simpleicons.org/microsoftonedrive",
            "Productivity",
            "Sync files from Microsoft OneDrive.",
        )
        .oauth(
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        )
        .scopes(&["Files.Read.All", "User.Read", "offline_access"])
        .client_env("MICROSOFT_OAUTH_CLIENT_ID", "MICROSOFT_OAUTH_CLIENT_SECRET")
        .userinfo("https://graph.microsoft.com/v1.0/me"),
        ProviderDescriptor::new(
            "dropbox",
            "Dropbox",
            "https://cdn.simpleicons.org/dropbox",
            "Productivity",
            "Access files stored in Dropbox.",
        )
        .oauth(
            "https://www.dropbox.com/oauth2/authorize",
            "https://api.dropboxapi.com/oauth2/token",
        )
        .client_env("DROPBOX_OAUTH_CLIENT_ID", "DROPBOX_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.dropboxapi.com/2/users/get_current_account")
        .extra_auth_params(&[("token_access_type", "offline")]),
        ProviderDescriptor::new(
            "box",
            "Box",
            "https://cdn.simpleicons.org/box",
            "Productivity",
            "Sync content from Box cloud storage.",
        )
        .oauth(
            "https://account.box.com/api/oauth2/authorize",
            "https://api.box.com/oauth2/token",
        )
        .client_env("BOX_OAUTH_CLIENT_ID", "BOX_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.box.com/2.0/users/me"),
        ProviderDescriptor::new(
            "airtable",
            "Airtable",
            "https://cdn.simpleicons.org/airtable",
            "Productivity",
            "Connect Airtable bases and tables.",
        )
        .oauth(
            "https://airtable.com/oauth2/v1/authorize",
            "https://airtable.com/oauth2/v1/token",
        )
        .scopes(&["data.records:read", "schema.bases:read"])
        .client_env("AIRTABLE_OAUTH_CLIENT_ID", "AIRTABLE_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.airtable.com/v0/meta/whoami"),
        ProviderDescriptor::new(
            "coda",
            "Coda",
            "https://cdn.simpleicons.org/coda",
            "Productivity",
            "Import docs from Coda.",
        )
        .oauth("https://coda.io/oauth/authorize", "https://coda.io/oauth/token")
        .scopes(&["doc:read"])
        .client_env("CODA_OAUTH_CLIENT_ID", "CODA_OAUTH_CLIENT_SECRET")
        .userinfo("https://coda.io/apis/v1/whoami"),
        // ── Communication ─────────────────────────────────────────────
        ProviderDescriptor::new(
            "slack",
            "Slack",
            "https://cdn.simpleicons.org/slack",
            "Communication",
            "Connect Slack to index channel messages and threads.",
        )
        .oauth(
            "https://slack.com/oauth/v2/authorize",
            "https://slack.com/api/oauth.v2.access",
        )
        .scopes(&["channels:read", "channels:history", "users:read"])
        .client_env("SLACK_OAUTH_CLIENT_ID", "SLACK_OAUTH_CLIENT_SECRET")
        .userinfo("https://slack.com/api/auth.test"),
        ProviderDescriptor::new(
            "microsoft_teams",
            "Microsoft Teams",
            "https://cdn.simpleicons.org/microsoftteams",
            "Communication",
            "Sync conversations from Microsoft Teams.",
        )
        .oauth(
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        )
        .scopes(&["Chat.Read", "User.Read", "offline_access"])
        .client_env("MICROSOFT_OAUTH_CLIENT_ID", "MICROSOFT_OAUTH_CLIENT_SECRET")
        .userinfo("https://graph.microsoft.com/v1.0/me"),
        ProviderDescriptor::new(
            "gmail",
            "Gmail",
            "https://cdn.simpleicons.org/gmail",
            "Communication",
            "Index emails from Gmail.",
        )
        .oauth(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )
        .scopes(&[
            "https://www.googleapis.com/auth/gmail.readonly",
            "openid",
            "email",
            "profile",
        ])
        .client_env("GOOGLE_OAUTH_CLIENT_ID", "GOOGLE_OAUTH_CLIENT_SECRET")
        .userinfo("https://www.googleapis.com/oauth2/v2/userinfo")
        .extra_auth_params(&[("access_type", "offline"), ("prompt", "consent")]),
        ProviderDescriptor::new(
            "outlook",
            "Outlook",
            "https://cdn.simpleicons.org/microsoftoutlook",
            "Communication",
            "Sync emails from Outlook.",
        )
        .oauth(
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        )
        .scopes(&["Mail.Read", "User.Read", "offline_access"])
        .client_env("MICROSOFT_OAUTH_CLIENT_ID", "MICROSOFT_OAUTH_CLIENT_SECRET")
        .userinfo("https://graph.microsoft.com/v1.0/me"),
        ProviderDescriptor::new(
            "discord",
            "Discord",
            "https://cdn.simpleicons.org/discord",
            "Communication",
            "Connect Discord servers and channels.",
        )
        .oauth(
            "https://discord.com/oauth2/authorize",
            "https://discord.com/api/oauth2/token",
        )
        .scopes(&["identify", "guilds"])
        .client_env("DISCORD_OAUTH_CLIENT_ID", "DISCORD_OAUTH_CLIENT_SECRET")
        .userinfo("https://discord.com/api/users/@me"),
        ProviderDescriptor::new(
            "zoom",
            "Zoom",
            "https://cdn.simpleicons.org/zoom",
            "Communication",
            "Sync Zoom meeting transcripts.",
        )
        .oauth("https://zoom.us/oauth/authorize", "https://zoom.us/oauth/token")
        .client_env("ZOOM_OAUTH_CLIENT_ID", "ZOOM_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.zoom.us/v2/users/me"),
        // ── Project Management ────────────────────────────────────────
        ProviderDescriptor::new(
            "jira",
            "Jira",
            "https://cdn.simpleicons.org/jira",
            "Project Management",
            "Connect Jira to sync issues and projects.",
        )
        .oauth(
            "https://auth.atlassian.com/authorize",
            "https://auth.atlassian.com/oauth/token",
        )
        .scopes(&["read:jira-work", "read:jira-user", "offline_access"])
        .client_env("ATLASSIAN_OAUTH_CLIENT_ID", "ATLASSIAN_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.atlassian.com/me")
        .extra_auth_params(&[("audience", "api.atlassian.com"), ("prompt", "consent")]),
        ProviderDescriptor::new(
            "confluence",
            "Confluence",
            "https://cdn.simpleicons.org/confluence",
            "Project Management",
            "Sync Confluence pages and spaces.",
        )
        .oauth(
            "https://auth.atlassian.com/authorize",
            "https://auth.atlassian.com/oauth/token",
        )
        .scopes(&[
            "read:confluence-content.all",
            "read:confluence-user",
            "offline_access",
        ])
        .client_env("ATLASSIAN_OAUTH_CLIENT_ID", "ATLASSIAN_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.atlassian.com/me")
        .extra_auth_params(&[("audience", "api.atlassian.com"), ("prompt", "consent")]),
        ProviderDescriptor::new(
            "asana",
            "Asana",
            "https://cdn.simpleicons.org/asana",
            "Project Management",
            "Import tasks and projects from Asana.",
        )
        .oauth(
            "https://app.asana.com/-/oauth_authorize",
            "https://app.asana.com/-/oauth_token",
        )
        .client_env("ASANA_OAUTH_CLIENT_ID", "ASANA_OAUTH_CLIENT_SECRET")
        .userinfo("https://app.asana.com/api/1.0/users/me"),
        ProviderDescriptor::new(
            "trello",
            "Trello",
            "https://cdn.simpleicons.org/trello",
            "Project Management",
            "Sync Trello boards and cards.",
        )
        .oauth(
            "https://trello.com/1/authorize",
            "https://trello.com/1/OAuthGetAccessToken",
        )
        .scopes(&["read"])
        .client_env("TRELLO_OAUTH_CLIENT_ID", "TRELLO_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "linear",
            "Linear",
            "https://cdn.simpleicons.org/linear",
            "Project Management",
            "Connect Linear to sync issues and projects.",
        )
        .oauth(
            "https://linear.app/oauth/authorize",
            "https://api.linear.app/oauth/token",
        )
        .scopes(&["read"])
        .client_env("LINEAR_OAUTH_CLIENT_ID", "LINEAR_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "monday",
            "Monday.com",
            "https://cdn.simpleicons.org/mondaydotcom",
            "Project Management",
            "Sync boards and items from Monday.com.",
        )
        .oauth(
            "https://auth.monday.com/oauth2/authorize",
            "https://auth.monday.com/oauth2/token",
        )
        .client_env("MONDAY_OAUTH_CLIENT_ID", "MONDAY_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "clickup",
            "ClickUp",
            "https://cdn.simpleicons.org/clickup",
            "Project Management",
            "Import tasks and docs from ClickUp.",
        )
        .oauth(
            "https://app.clickup.com/api",
            "https://api.clickup.com/api/v2/oauth/token",
        )
        .client_env("CLICKUP_OAUTH_CLIENT_ID", "CLICKUP_OAUTH_CLIENT_SECRET"),
        // ── Developer Tools ───────────────────────────────────────────
        ProviderDescriptor::new(
            "github",
            "GitHub",
            "https://cdn.simpleicons.org/github/000000",
            "Developer Tools",
            "Index repositories and documentation from GitHub.",
        )
        .oauth(
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
        )
        .scopes(&["read:user", "repo"])
        .client_env("GITHUB_OAUTH_CLIENT_ID", "GITHUB_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.github.com/user"),
        ProviderDescriptor::new(
            "gitlab",
            "GitLab",
            "https://cdn.simpleicons.org/gitlab",
            "Developer Tools",
            "Sync repositories from GitLab.",
        )
        .oauth("https://gitlab.com/oauth/authorize", "https://gitlab.com/oauth/token")
        .scopes(&["read_user", "read_api"])
        .client_env("GITLAB_OAUTH_CLIENT_ID", "GITLAB_OAUTH_CLIENT_SECRET")
        .userinfo("https://gitlab.com/api/v4/user"),
        ProviderDescriptor::new(
            "bitbucket",
            "Bitbucket",
            "https://cdn.simpleicons.org/bitbucket",
            "Developer Tools",
            "Connect Bitbucket repositories.",
        )
        .oauth(
            "https://bitbucket.org/site/oauth2/authorize",
            "https://bitbucket.org/site/oauth2/access_token",
        )
        .scopes(&["repository", "account"])
        .client_env("BITBUCKET_OAUTH_CLIENT_ID", "BITBUCKET_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.bitbucket.org/2.0/user"),
        ProviderDescriptor::new(
            "figma",
            "Figma",
            "https://cdn.simpleicons.org/figma",
            "Developer Tools",
            "Access Figma files and design data.",
        )
        .oauth("https://www.figma.com/oauth", "https://www.figma.com/api/oauth/token")
        .scopes(&["file_read"])
        .client_env("FIGMA_OAUTH_CLIENT_ID", "FIGMA_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.figma.com/v1/me"),
        // ── CRM & Sales ───────────────────────────────────────────────
        ProviderDescriptor::new(
            "salesforce",
            "Salesforce",
            "https://cdn.simpleicons.org/salesforce",
            "CRM & Sales",
            "Sync contacts, leads, and knowledge from Salesforce.",
        )
        .oauth(
            "https://login.salesforce.com/services/oauth2/authorize",
            "https://login.salesforce.com/services/oauth2/token",
        )
        .scopes(&["api", "refresh_token"])
        .client_env("SALESFORCE_OAUTH_CLIENT_ID", "SALESFORCE_OAUTH_CLIENT_SECRET")
        .userinfo("https://login.salesforce.com/services/oauth2/userinfo"),
        ProviderDescriptor::new(
            "hubspot",
            "HubSpot",
            "https://cdn.simpleicons.org/hubspot",
            "CRM & Sales",
            "Connect HubSpot CRM data.",
        )
        .oauth(
            "https://app.hubspot.com/oauth/authorize",
            "https://api.hubapi.com/oauth/v1/token",
        )
        .scopes(&["crm.objects.contacts.read"])
        .client_env("HUBSPOT_OAUTH_CLIENT_ID", "HUBSPOT_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.hubapi.com/oauth/v1/access-tokens/"),
        ProviderDescriptor::new(
            "pipedrive",
            "Pipedrive",
            "https://cdn.simpleicons.org/pipedrive",
            "CRM & Sales",
            "Sync deals and contacts from Pipedrive.",
        )
        .oauth(
            "https://oauth.pipedrive.com/oauth/authorize",
            "https://oauth.pipedrive.com/oauth/token",
        )
        .client_env("PIPEDRIVE_OAUTH_CLIENT_ID", "PIPEDRIVE_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.pipedrive.com/v1/users/me"),
        ProviderDescriptor::new(
            "zoho_crm",
            "Zoho CRM",
            "https://cdn.simpleicons.org/zoho",
            "CRM & Sales",
            "Connect your Zoho CRM account.",
        )
        .oauth(
            "https://accounts.zoho.com/oauth/v2/auth",
            "https://accounts.zoho.com/oauth/v2/token",
        )
        .scopes(&["ZohoCRM.modules.ALL"])
        .client_env("ZOHO_OAUTH_CLIENT_ID", "ZOHO_OAUTH_CLIENT_SECRET")
        .userinfo("https://www.zohoapis.com/crm/v2/users?type=CurrentUser"),
        // ── Support ───────────────────────────────────────────────────
        ProviderDescriptor::new(
            "zendesk",
            "Zendesk",
            "https://cdn.simpleicons.org/zendesk",
            "Support",
            "Sync Zendesk tickets and help center articles.",
        )
        .oauth(
            "https://d3v-yoursubdomain.zendesk.com/oauth/authorizations/new",
            "https://d3v-yoursubdomain.zendesk.com/oauth/tokens",
        )
        .scopes(&["read"])
        .client_env("ZENDESK_OAUTH_CLIENT_ID", "ZENDESK_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "intercom",
            "Intercom",
            "https://cdn.simpleicons.org/intercom",
            "Support",
            "Connect Intercom conversations and articles.",
        )
        .oauth(
            "https://app.intercom.com/oauth",
            "https://api.intercom.io/auth/eagle/token",
        )
        .client_env("INTERCOM_OAUTH_CLIENT_ID", "INTERCOM_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.intercom.io/me"),
        ProviderDescriptor::new(
            "freshdesk",
            "Freshdesk",
            "https://cdn.simpleicons.org/freshdesk",
            "Support",
            "Sync Freshdesk tickets and solutions.",
        )
        .client_env("FRESHDESK_OAUTH_CLIENT_ID", "FRESHDESK_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "helpscout",
            "Help Scout",
            "https://cdn.simpleicons.org/helpscout",
            "Support",
            "Connect Help Scout mailboxes and docs.",
        )
        .oauth(
            "https://secure.helpscout.net/authentication/authorizeClientApplication",
            "https://api.helpscout.net/v2/oauth2/token",
        )
        .client_env("HELPSCOUT_OAUTH_CLIENT_ID", "HELPSCOUT_OAUTH_CLIENT_SECRET"),
        // ── Social Media ──────────────────────────────────────────────
        ProviderDescriptor::new(
            "instagram",
            "Instagram",
            "https://cdn.simpleicons.org/instagram",
            "Social Media",
            "Connect your Instagram business account.",
        )
        .oauth(
            "https://api.instagram.com/oauth/authorize",
            "https://api.instagram.com/oauth/access_token",
        )
        .scopes(&["user_profile", "user_media"])
        .client_env("INSTAGRAM_OAUTH_CLIENT_ID", "INSTAGRAM_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "facebook",
            "Facebook",
            "https://cdn.simpleicons.org/facebook",
            "Social Media",
            "Connect Facebook pages and data.",
        )
        .oauth(
            "https://www.facebook.com/v18.0/dialog/oauth",
            "https://graph.facebook.com/v18.0/oauth/access_token",
        )
        .scopes(&["pages_read_engagement", "public_profile"])
        .client_env("FACEBOOK_OAUTH_CLIENT_ID", "FACEBOOK_OAUTH_CLIENT_SECRET")
        .userinfo("https://graph.facebook.com/me?fields=id,name,email"),
        ProviderDescriptor::new(
            "twitter",
            "Twitter / X",
            "https://cdn.simpleicons.org/x/000000",
            "Social Media",
            "Connect your X (Twitter) account.",
        )
        .oauth(
            "https://twitter.com/i/oauth2/authorize",
            "https://api.twitter.com/2/oauth2/token",
        )
        .scopes(&["tweet.read", "users.read", "offline.access"])
        .client_env("TWITTER_OAUTH_CLIENT_ID", "TWITTER_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.twitter.com/2/users/me"),
        ProviderDescriptor::new(
            "linkedin",
            "LinkedIn",
            "https://cdn.simpleicons.org/linkedin",
            "Social Media",
            "Connect your LinkedIn profile.",
        )
        .oauth(
            "https://www.linkedin.com/oauth/v2/authorization",
            "https://www.linkedin.com/oauth/v2/accessToken",
        )
        .scopes(&["openid", "profile", "email"])
        .client_env("LINKEDIN_OAUTH_CLIENT_ID", "LINKEDIN_OAUTH_CLIENT_SECRET")
        .userinfo("https://api.linkedin.com/v2/userinfo"),
        // ── Other ─────────────────────────────────────────────────────
        ProviderDescriptor::new(
            "shopify",
            "Shopify",
            "https://cdn.simpleicons.org/shopify",
            "Other",
            "Sync product and store data from Shopify.",
        )
        .oauth(
            "https://{shop}.myshopify.com/admin/oauth/authorize",
            "https://{shop}.myshopify.com/admin/oauth/access_token",
        )
        .scopes(&["read_products", "read_content"])
        .client_env("SHOPIFY_OAUTH_CLIENT_ID", "SHOPIFY_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "stripe",
            "Stripe",
            "https://cdn.simpleicons.org/stripe",
            "Other",
            "Connect Stripe for payment data.",
        )
        .oauth(
            "https://connect.stripe.com/oauth/authorize",
            "https://connect.stripe.com/oauth/token",
        )
        .scopes(&["read_only"])
        .client_env("STRIPE_OAUTH_CLIENT_ID", "STRIPE_OAUTH_CLIENT_SECRET"),
        ProviderDescriptor::new(
            "custom",
            "Custom",
            "",
            "Other",
            "Add a custom integration with manual credentials.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notion_descriptor() {
        let notion = get("notion").expect("notion should be in the catalog");
        assert!(!notion.auth_url.is_empty());
        assert!(!notion.token_url.is_empty());
        assert!(!notion.userinfo_url.is_empty());
        assert!(notion.supports_sync);
        assert_eq!(notion.token_auth, TokenAuthStyle::BasicHeader);
        assert_eq!(notion.identity_shape, IdentityShape::NotionBot);
        assert!(notion
            .userinfo_headers
            .iter()
            .any(|(k, v)| k == "Notion-Version" && v == "2022-06-28"));
    }

    #[test]
    fn test_unknown_provider_absent() {
        assert!(get("not-a-real-app").is_none());
    }

    #[test]
    fn test_catalog_order_is_stable() {
        let first: Vec<&str> = all().iter().map(|p| p.id.as_str()).collect();
        let second: Vec<&str> = all().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "notion");
    }

    #[test]
    fn test_supports_oauth() {
        assert!(supports_oauth(get("github").unwrap()));
        // Freshdesk has no OAuth endpoints
        assert!(!supports_oauth(get("freshdesk").unwrap()));
        assert!(!supports_oauth(get("custom").unwrap()));
    }

    #[test]
    fn test_custom_always_configured() {
        assert!(is_configured(get("custom").unwrap()));
    }

    #[test]
    fn test_is_configured_requires_both_env_vars() {
        let provider = ProviderDescriptor::new("envtest", "Env Test", "", "Other", "")
            .oauth("https://example.com/auth", "https://example.com/token")
            .client_env("CATALOG_TEST_CLIENT_ID", "CATALOG_TEST_CLIENT_SECRET");

        std::env::remove_var("CATALOG_TEST_CLIENT_ID");
        std::env::remove_var("CATALOG_TEST_CLIENT_SECRET");
        assert!(!is_configured(&provider));

        std::env::set_var("CATALOG_TEST_CLIENT_ID", "id");
        assert!(!is_configured(&provider));

        std::env::set_var("CATALOG_TEST_CLIENT_SECRET", "secret");
        assert!(is_configured(&provider));

        std::env::remove_var("CATALOG_TEST_CLIENT_ID");
        std::env::remove_var("CATALOG_TEST_CLIENT_SECRET");
    }

    #[test]
    fn test_categories_first_seen_order() {
        let cats = categories();
        assert_eq!(cats[0], "Productivity");
        assert!(cats.contains(&"Developer Tools"));
        // No duplicates
        let mut dedup = cats.clone();
        dedup.dedup();
        assert_eq!(cats.len(), dedup.len());
    }

    #[test]
    fn test_catalog_size() {
        // ~40 integrations across 8 categories plus the synthetic custom entry
        assert!(all().len() >= 40);
        assert_eq!(categories().len(), 8);
    }
}
