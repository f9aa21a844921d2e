use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use invoice_console::commands::{dashboard, invoices, reports};
use invoice_console::models::{Division, EditableField, InvoiceId, LineItemField, Role};
use invoice_console::services::export::{cell_text, ExportFormat};
use invoice_console::services::merge::MergeOutcome;
use invoice_console::utils::{parse_date, today_stamp, DateRange};
use invoice_console::{ApiClient, AppConfig, AuthContext};

const USAGE: &str = "\
invoice-console <command> [args]

Commands:
  dashboard [FROM TO]                      stats and recent invoices
  list [DIVISION]                          all invoices, optionally one division
  queue [DIVISION]                         pending approvals (last month)
  approve DIVISION ID                      approve a pending invoice
  upload DIVISION FILE.pdf                 upload a PDF for extraction
  edit DIVISION ID FIELD VALUE             change one flat invoice field
  edit-item DIVISION ID INDEX FIELD VALUE  change one line-item cell
  pdf DIVISION ID OUT                      download the invoice PDF
  export FORMAT OUT [FROM TO]              export recent invoices (json|tabular)
  report FORMAT OUT FROM TO                backend report (json|tabular)
  register USERNAME PASSWORD ROLE          create a user (admin)

Environment:
  INVOICE_API_URL, INVOICE_USERNAME, INVOICE_PASSWORD
  INVOICE_HTTP_TIMEOUT_SECS, RUST_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let config = AppConfig::from_env();
    let client = ApiClient::new(&config.api)?;
    let auth = login_from_env(&client).await?;

    match command.as_str() {
        "dashboard" => run_dashboard(&client, &auth, rest).await,
        "list" => run_list(&client, &auth, rest).await,
        "queue" => run_queue(&client, &auth, rest).await,
        "approve" => run_approve(&client, &auth, rest).await,
        "upload" => run_upload(&client, &auth, rest).await,
        "edit" => run_edit(&client, &auth, rest).await,
        "edit-item" => run_edit_item(&client, &auth, rest).await,
        "pdf" => run_pdf(&client, &auth, rest).await,
        "export" => run_export(&client, &auth, rest).await,
        "report" => run_report(&client, &auth, rest).await,
        "register" => run_register(&client, &auth, rest).await,
        other => {
            println!("{}", USAGE);
            bail!("unknown command: {}", other);
        }
    }
}

async fn login_from_env(client: &ApiClient) -> Result<AuthContext> {
    let username =
        std::env::var("INVOICE_USERNAME").context("INVOICE_USERNAME is not set")?;
    let password =
        std::env::var("INVOICE_PASSWORD").context("INVOICE_PASSWORD is not set")?;
    let auth = client.login(&username, &password).await?;
    info!(username, role = auth.role().as_str(), "authenticated");
    Ok(auth)
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument: {}", name))
}

fn division_arg(value: &str) -> Result<Division> {
    Division::from_str(value).map_err(|e| anyhow!(e))
}

fn range_args(args: &[String], from_index: usize) -> Result<DateRange> {
    match (args.get(from_index), args.get(from_index + 1)) {
        (Some(from), Some(to)) => Ok(DateRange::new(
            parse_date(from).map_err(|e| anyhow!(e))?,
            parse_date(to).map_err(|e| anyhow!(e))?,
        )),
        (None, _) => Ok(DateRange::last_month()),
        (Some(_), None) => bail!("FROM given without TO"),
    }
}

fn print_merge(outcome: &MergeOutcome) {
    for failure in &outcome.failed {
        eprintln!(
            "warning: failed to fetch invoices for {}: {}",
            failure.division, failure.error
        );
    }
    println!(
        "{:<16} {:<14} {:<24} {:<12} {:<10} {}",
        "division", "invoice #", "supplier", "date", "amount", "status"
    );
    for record in &outcome.invoices {
        let invoice = &record.invoice;
        println!(
            "{:<16} {:<14} {:<24} {:<12} {:<10} {}",
            record.division,
            invoice.invoice_number,
            invoice.supplier_name,
            invoice.invoice_date,
            cell_text(invoice.total_amount.as_ref()),
            invoice.status
        );
    }
}

async fn run_dashboard(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let range = range_args(args, 0)?;
    let data = dashboard::load_dashboard(client, auth, range).await;

    for failure in &data.failed {
        eprintln!(
            "warning: failed to fetch invoices for {}: {}",
            failure.division, failure.error
        );
    }
    println!(
        "{} .. {}",
        data.range.start_param(),
        data.range.end_param()
    );
    println!("submitted: {}", data.stats.submitted);
    println!("processed: {}", data.stats.processed);
    println!("pending:   {}", data.stats.pending);
    println!("recent invoices:");
    for record in &data.recent {
        println!(
            "  {:<16} {:<14} {:<24} {}",
            record.division,
            record.invoice.invoice_number,
            record.invoice.supplier_name,
            record.invoice.status
        );
    }
    Ok(())
}

async fn run_list(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let filter = args.first().map(|d| division_arg(d)).transpose()?;
    let outcome = invoices::list_invoices(client, auth, filter).await;
    print_merge(&outcome);
    Ok(())
}

async fn run_queue(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let filter = args.first().map(|d| division_arg(d)).transpose()?;
    let outcome =
        invoices::pending_queue(client, auth, filter, DateRange::last_month()).await;
    print_merge(&outcome);
    Ok(())
}

async fn run_approve(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let division = division_arg(arg(args, 0, "DIVISION")?)?;
    let id = InvoiceId::from(arg(args, 1, "ID")?);
    invoices::approve(client, auth, division, &id).await?;
    println!("approved {}/{}", division, id);
    Ok(())
}

async fn run_upload(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let division = division_arg(arg(args, 0, "DIVISION")?)?;
    let path = PathBuf::from(arg(args, 1, "FILE")?);
    let receipt = invoices::upload(client, auth, division, &path).await?;
    println!("uploaded as {}/{}", division, receipt.id);
    Ok(())
}

async fn run_edit(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let division = division_arg(arg(args, 0, "DIVISION")?)?;
    let id = InvoiceId::from(arg(args, 1, "ID")?);
    let field = EditableField::from_str(arg(args, 2, "FIELD")?).map_err(|e| anyhow!(e))?;
    let value = arg(args, 3, "VALUE")?;

    let mut buffer = invoices::open_editor(client, auth, division, &id).await?;
    buffer.set_field(field, value);
    buffer.commit(client, auth).await.map_err(|e| e.error)?;
    println!("saved {}/{}", division, id);
    Ok(())
}

async fn run_edit_item(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let division = division_arg(arg(args, 0, "DIVISION")?)?;
    let id = InvoiceId::from(arg(args, 1, "ID")?);
    let index: usize = arg(args, 2, "INDEX")?.parse().context("INDEX")?;
    let field = LineItemField::from_str(arg(args, 3, "FIELD")?).map_err(|e| anyhow!(e))?;
    let value = arg(args, 4, "VALUE")?;

    let mut buffer = invoices::open_editor(client, auth, division, &id).await?;
    buffer.set_line_item(index, field, value)?;
    buffer.commit(client, auth).await.map_err(|e| e.error)?;
    println!("saved {}/{}", division, id);
    Ok(())
}

async fn run_pdf(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let division = division_arg(arg(args, 0, "DIVISION")?)?;
    let id = InvoiceId::from(arg(args, 1, "ID")?);
    let out = PathBuf::from(arg(args, 2, "OUT")?);
    let bytes = invoices::download_pdf(client, auth, division, &id).await?;
    std::fs::write(&out, bytes).with_context(|| format!("write {}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}

async fn run_export(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let format = ExportFormat::from_str(arg(args, 0, "FORMAT")?).map_err(|e| anyhow!(e))?;
    let out = PathBuf::from(arg(args, 1, "OUT")?);
    let range = range_args(args, 2)?;

    let data = dashboard::load_dashboard(client, auth, range).await;
    let bytes = dashboard::export_recent(&data.recent, format)?;
    std::fs::write(&out, bytes).with_context(|| format!("write {}", out.display()))?;
    println!("wrote {} ({})", out.display(), today_stamp());
    Ok(())
}

async fn run_report(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let format = ExportFormat::from_str(arg(args, 0, "FORMAT")?).map_err(|e| anyhow!(e))?;
    let out = PathBuf::from(arg(args, 1, "OUT")?);
    let range = DateRange::new(
        parse_date(arg(args, 2, "FROM")?).map_err(|e| anyhow!(e))?,
        parse_date(arg(args, 3, "TO")?).map_err(|e| anyhow!(e))?,
    );

    let rows = reports::generate(client, auth, &range).await?;
    let bytes = reports::encode(&rows, format)?;
    std::fs::write(&out, bytes).with_context(|| format!("write {}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}

async fn run_register(client: &ApiClient, auth: &AuthContext, args: &[String]) -> Result<()> {
    let username = arg(args, 0, "USERNAME")?;
    let password = arg(args, 1, "PASSWORD")?;
    let role = match arg(args, 2, "ROLE")? {
        "admin" => Role::Admin,
        "gate" => Role::Gate,
        "store" => Role::Store,
        other => bail!("unknown role: {}", other),
    };
    let message = client.register(auth, username, password, role).await?;
    println!("{}", message);
    Ok(())
}
