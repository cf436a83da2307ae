//! Request metering against reservations and on-demand deposits.

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use prism_payment_api::{
    ActiveReservation, ChainPaymentState, OnDemandDeposit, PaymentError, PaymentHeader,
    PaymentResult, UsageLedger,
};

use crate::config::{ChainTimeouts, MeteringConfig};
use crate::constants::ON_DEMAND_QUORUMS;
use crate::pricing::{charged_size, payment_charged};

/// Decides, per request, whether a client is entitled to service and records
/// accepted usage so the next decision is correctly informed.
///
/// A request with a zero cumulative payment is billed against the account's
/// pre-funded reservation (rate-limited per time bin); any other request is
/// billed against the account's on-demand deposit (pay per byte). Both paths
/// read the authoritative entitlements from a [`ChainPaymentState`] and
/// record usage in a [`UsageLedger`].
///
/// The meterer holds no mutable state of its own: all serialisation happens
/// inside the ledger, so a single instance may be shared freely across
/// worker tasks.
pub struct Meterer<C, S> {
    config: MeteringConfig,
    timeouts: ChainTimeouts,
    chain: C,
    ledger: S,
}

impl<C, S> Meterer<C, S> {
    /// Create a meterer over the given chain reader and usage ledger.
    pub fn new(config: MeteringConfig, timeouts: ChainTimeouts, chain: C, ledger: S) -> Self {
        Self {
            config,
            timeouts,
            chain,
            ledger,
        }
    }

    /// The metering parameters in force.
    pub fn config(&self) -> &MeteringConfig {
        &self.config
    }
}

impl<C, S> Meterer<C, S>
where
    C: ChainPaymentState,
    S: UsageLedger,
{
    /// Meter a single request: `Ok(())` accepts it with its usage recorded,
    /// an error rejects it with the specific kind.
    ///
    /// Chain-adapter failures surface as
    /// [retryable](PaymentError::retryable); every rejection produced by the
    /// accounting itself is terminal for the request.
    pub async fn meter_request(&self, header: &PaymentHeader) -> PaymentResult<()> {
        let block = self.chain_read(self.chain.current_block_number()).await?;

        if header.is_on_demand() {
            let deposit = self
                .chain_read(self.chain.on_demand_deposit(block, header.account))
                .await?
                .unwrap_or(OnDemandDeposit {
                    cumulative_payment: 0,
                });
            self.serve_on_demand(header, &deposit).await
        } else {
            let reservation = self
                .chain_read(self.chain.active_reservation(block, header.account))
                .await?
                .ok_or(PaymentError::NoReservation(header.account))?;
            self.serve_reservation(header, &reservation).await
        }
    }

    /// Apply the chain-read deadline to an adapter call.
    async fn chain_read<T>(
        &self,
        call: impl Future<Output = PaymentResult<T>>,
    ) -> PaymentResult<T> {
        match tokio::time::timeout(self.timeouts.read, call).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::ChainUnavailable(format!(
                "read timed out after {:?}",
                self.timeouts.read
            ))),
        }
    }

    // ---- reservation path ----

    async fn serve_reservation(
        &self,
        header: &PaymentHeader,
        reservation: &ActiveReservation,
    ) -> PaymentResult<()> {
        validate_quorums(&header.quorum_numbers, &reservation.quorum_numbers)?;
        self.validate_bin_index(header, reservation)?;
        self.record_bin_usage(header, reservation).await
    }

    /// The declared bin must be the current or immediately previous index,
    /// and must fall inside the reservation's validity window.
    fn validate_bin_index(
        &self,
        header: &PaymentHeader,
        reservation: &ActiveReservation,
    ) -> PaymentResult<()> {
        let window = self.config.reservation_window;
        let current = bin_index(unix_now(), window);
        let is_recent =
            header.bin_index == current || Some(header.bin_index) == current.checked_sub(1);

        let start = bin_index(reservation.start_timestamp, window);
        let end = bin_index(reservation.end_timestamp, window);
        if !is_recent || header.bin_index < start || header.bin_index > end {
            return Err(PaymentError::InvalidBinIndex {
                bin_index: header.bin_index,
            });
        }
        Ok(())
    }

    /// Atomically charge the bin and classify the post-increment usage.
    async fn record_bin_usage(
        &self,
        header: &PaymentHeader,
        reservation: &ActiveReservation,
    ) -> PaymentResult<()> {
        let size = charged_size(header.data_length, self.config.min_chargeable_size);
        let usage = self
            .ledger
            .increment_reservation_bin(header.account, header.bin_index, size)
            .await?;

        if usage <= reservation.data_rate {
            debug!(
                account = %header.account,
                bin = header.bin_index,
                usage,
                "reservation usage recorded"
            );
            return Ok(());
        }
        if usage - size >= reservation.data_rate {
            // The bin was already at the cap before this request contributed.
            return Err(PaymentError::BinFilled {
                bin_index: header.bin_index,
            });
        }

        // A single request may straddle the cap, borrowing up to one bin's
        // worth of bandwidth. The excess is charged two bins ahead: skipping
        // the adjacent bin keeps back-to-back overflows from doubling the
        // sustained rate.
        let end = bin_index(reservation.end_timestamp, self.config.reservation_window);
        let forward_bin = header.bin_index.checked_add(2).filter(|&bin| bin <= end);
        if usage <= reservation.data_rate.saturating_mul(2) {
            if let Some(forward_bin) = forward_bin {
                let excess = usage - reservation.data_rate;
                // Best-effort follow-up: the accept decision stands even if
                // the forward charge cannot be recorded.
                if let Err(err) = self
                    .ledger
                    .increment_reservation_bin(header.account, forward_bin, excess)
                    .await
                {
                    warn!(
                        account = %header.account,
                        bin = forward_bin,
                        excess,
                        %err,
                        "failed to record overflow usage"
                    );
                }
                debug!(
                    account = %header.account,
                    bin = header.bin_index,
                    usage,
                    forward_bin,
                    excess,
                    "reservation overflow accepted"
                );
                return Ok(());
            }
        }
        Err(PaymentError::BinOverflow {
            bin_index: header.bin_index,
            usage,
        })
    }

    // ---- on-demand path ----

    async fn serve_on_demand(
        &self,
        header: &PaymentHeader,
        deposit: &OnDemandDeposit,
    ) -> PaymentResult<()> {
        validate_quorums(&header.quorum_numbers, ON_DEMAND_QUORUMS)?;
        self.check_global_bin_index(header);

        // Materialise the claim before checking it, so two concurrent
        // requests cannot both validate against a view of history that is
        // missing the other. The conditional insert is the serialisation
        // point; a losing duplicate is rejected here.
        self.ledger
            .insert_on_demand_payment(
                header.account,
                header.cumulative_payment,
                header.data_length,
            )
            .await?;

        if let Err(err) = self.validate_payment(header, deposit).await {
            // Withdraw the claim this request materialised so the rejection
            // leaves no record behind.
            self.remove_payment(header).await;
            return Err(err);
        }

        let size = charged_size(header.data_length, self.config.min_chargeable_size);
        match self.ledger.increment_global_bin(unix_now(), size).await {
            Ok(usage) if usage <= self.config.global_bytes_per_second => {
                debug!(
                    account = %header.account,
                    payment = header.cumulative_payment,
                    usage,
                    "on-demand payment recorded"
                );
                Ok(())
            }
            Ok(usage) => {
                self.remove_payment(header).await;
                Err(PaymentError::GlobalRateLimited {
                    usage,
                    limit: self.config.global_bytes_per_second,
                })
            }
            Err(err) => {
                self.remove_payment(header).await;
                Err(err)
            }
        }
    }

    /// Check the claimed payment against the deposit and its price-ordered
    /// neighbors. Runs after the claim is inserted; the neighbor query never
    /// returns the claim itself.
    async fn validate_payment(
        &self,
        header: &PaymentHeader,
        deposit: &OnDemandDeposit,
    ) -> PaymentResult<()> {
        if header.cumulative_payment > deposit.cumulative_payment {
            return Err(PaymentError::InsufficientDeposit {
                claimed: header.cumulative_payment,
                deposit: deposit.cumulative_payment,
            });
        }

        let neighbors = self
            .ledger
            .on_demand_neighbors(header.account, header.cumulative_payment)
            .await?;

        // The claim must increment the previous payment by at least this
        // request's charge.
        let prev_payment = neighbors
            .prev
            .map_or(0, |record| record.cumulative_payment);
        let charge = self.payment_charged(header.data_length)?;
        match prev_payment.checked_add(charge) {
            Some(required) if required <= header.cumulative_payment => {}
            _ => {
                return Err(PaymentError::InsufficientIncrement {
                    claimed: header.cumulative_payment,
                    required: prev_payment.saturating_add(charge),
                })
            }
        }

        // And it must leave the next payment's increment intact, so the two
        // requests stay valid even if delivered out of order.
        if let Some(next) = neighbors.next {
            let next_charge = self.payment_charged(next.data_length)?;
            if header.cumulative_payment.saturating_add(next_charge) > next.cumulative_payment {
                return Err(PaymentError::NeighborInvariant {
                    claimed: header.cumulative_payment,
                    next: next.cumulative_payment,
                });
            }
        }
        Ok(())
    }

    /// Best-effort withdrawal of a record this request inserted.
    async fn remove_payment(&self, header: &PaymentHeader) {
        if let Err(err) = self
            .ledger
            .remove_on_demand_payment(header.account, header.cumulative_payment)
            .await
        {
            warn!(
                account = %header.account,
                payment = header.cumulative_payment,
                %err,
                "failed to remove rejected payment record"
            );
        }
    }

    /// On-demand bins are declared at one-second resolution but the
    /// authoritative counter keys on the local clock, so a stale declaration
    /// is only worth a log line.
    fn check_global_bin_index(&self, header: &PaymentHeader) {
        let current = unix_now();
        let declared = u64::from(header.bin_index);
        if declared != current && declared + 1 != current {
            debug!(
                account = %header.account,
                declared,
                current,
                "on-demand bin index outside the current second"
            );
        }
    }

    fn payment_charged(&self, data_length: u32) -> PaymentResult<u64> {
        payment_charged(
            data_length,
            self.config.min_chargeable_size,
            self.config.price_per_chargeable,
        )
    }
}

/// Quorum subset check shared by both billing paths: the requested set must
/// be non-empty and every member must be allowed. A single out-of-set quorum
/// rejects the whole request.
pub(crate) fn validate_quorums(requested: &[u8], allowed: &[u8]) -> PaymentResult<()> {
    if requested.is_empty() {
        return Err(PaymentError::MissingQuorums);
    }
    match requested.iter().find(|quorum| !allowed.contains(quorum)) {
        Some(&quorum) => Err(PaymentError::InvalidQuorum { quorum }),
        None => Ok(()),
    }
}

/// The accounting bin a timestamp falls into, chunking time by the window
/// width. The window in force is public information shared by all dispersal
/// nodes.
pub fn bin_index(timestamp: u64, window: u32) -> u32 {
    (timestamp / u64::from(window)) as u32
}

/// Seconds since the Unix epoch on the local clock.
///
/// Bin boundaries are computed from this, so clock skew between workers must
/// stay below one reservation window.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
