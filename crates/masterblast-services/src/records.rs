//! GenBank and FASTA records shown on the hit page
//!
//! Records are fetched from Entrez the first time any hit on an accession is
//! viewed and served from the accession's cache afterwards.

use masterblast_core::models::{BlastProgram, EntrezAccession, EntrezAccessionCache};
use masterblast_core::AppError;
use masterblast_db::AccessionStore;

use crate::ncbi::EntrezService;

#[tracing::instrument(skip(accessions, entrez, accession), fields(accession = %accession.code))]
pub async fn load_accession_records(
    accessions: &dyn AccessionStore,
    entrez: &dyn EntrezService,
    accession: &EntrezAccession,
    program: BlastProgram,
) -> Result<EntrezAccessionCache, AppError> {
    if let Some(cache_id) = accession.cache_id {
        match accessions.get_accession_cache(cache_id).await {
            Ok(cache) => return Ok(cache),
            Err(e) if e.is_not_found() => {
                tracing::warn!(cache_id = cache_id, "Linked accession cache is missing");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let db = program.entrez_db();
    let (genbank, fasta) = tokio::join!(
        entrez.fetch_record_text(db, &accession.code, "gb"),
        entrez.fetch_record_text(db, &accession.code, "fasta"),
    );

    let cache = accessions
        .attach_accession_cache(accession.id, &genbank, &fasta)
        .await?;
    tracing::debug!(cache_id = cache.id, "Cached Entrez records");
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use masterblast_db::test_helpers::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEntrez {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntrezService for CountingEntrez {
        async fn efetch(
            &self,
            db: &str,
            id: &str,
            rettype: &str,
            _retmode: &str,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match rettype {
                "fasta" => Ok(format!(">{id} from {db}\nACGT\n")),
                _ => Err(anyhow!("record unavailable")),
            }
        }
    }

    #[tokio::test]
    async fn test_records_are_fetched_once() {
        let store = MemoryStore::new();
        let accession = store.insert_accession("NM_000518", "Homo sapiens");
        let entrez = CountingEntrez::default();

        let first = load_accession_records(&store, &entrez, &accession, BlastProgram::Blastn)
            .await
            .unwrap();
        assert_eq!(first.fasta, ">NM_000518 from nucleotide\nACGT\n");
        assert_eq!(first.genbank, "Error: record unavailable");
        assert_eq!(entrez.calls.load(Ordering::SeqCst), 2);

        let linked = store
            .accessions()
            .into_iter()
            .find(|a| a.id == accession.id)
            .unwrap();
        assert_eq!(linked.cache_id, Some(first.id));

        let second = load_accession_records(&store, &entrez, &linked, BlastProgram::Blastn)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(entrez.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_accession_snapshot_reuses_linked_cache() {
        let store = MemoryStore::new();
        let accession = store.insert_accession("P69905", "Homo sapiens");
        let entrez = CountingEntrez::default();

        let first = load_accession_records(&store, &entrez, &accession, BlastProgram::Blastp)
            .await
            .unwrap();
        // `accession` still has no cache_id, as a concurrent request would see it
        let second = load_accession_records(&store, &entrez, &accession, BlastProgram::Blastp)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert!(first.fasta.contains("from protein"));
    }
}
