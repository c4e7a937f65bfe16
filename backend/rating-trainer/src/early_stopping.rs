/// Early stopping on validation loss.
///
/// An epoch improves when its loss is strictly below the best so far. After
/// `patience` consecutive epochs without improvement training stops. The
/// snapshot taken at the best epoch is kept so its weights can be restored.
#[derive(Debug)]
pub struct EarlyStopping<M> {
    patience: usize,
    stale_epochs: usize,
    best: Option<BestEpoch<M>>,
}

#[derive(Debug)]
pub struct BestEpoch<M> {
    pub epoch: usize,
    pub loss: f32,
    pub snapshot: M,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Improved,
    Stalled { remaining: usize },
    Stop,
}

impl<M> EarlyStopping<M> {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            stale_epochs: 0,
            best: None,
        }
    }

    pub fn observe(&mut self, epoch: usize, loss: f32, snapshot: M) -> Progress {
        let improved = match &self.best {
            None => true,
            Some(best) => loss < best.loss,
        };

        if improved {
            self.best = Some(BestEpoch {
                epoch,
                loss,
                snapshot,
            });
            self.stale_epochs = 0;
            return Progress::Improved;
        }

        self.stale_epochs += 1;
        if self.stale_epochs >= self.patience {
            Progress::Stop
        } else {
            Progress::Stalled {
                remaining: self.patience - self.stale_epochs,
            }
        }
    }

    pub fn best(&self) -> Option<&BestEpoch<M>> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<BestEpoch<M>> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_after_patience_and_keeps_best() {
        let mut stopper = EarlyStopping::new(3);
        let losses = [1.0, 0.8, 0.9, 0.85, 0.81];
        let mut progress = Vec::new();
        for (epoch, loss) in losses.iter().enumerate() {
            progress.push(stopper.observe(epoch + 1, *loss, format!("weights@{}", epoch + 1)));
        }

        assert_eq!(progress[1], Progress::Improved);
        assert_eq!(progress[2], Progress::Stalled { remaining: 2 });
        assert_eq!(progress[4], Progress::Stop);

        let best = stopper.into_best().unwrap();
        assert_eq!(best.epoch, 2);
        assert_eq!(best.snapshot, "weights@2");
    }

    #[test]
    fn test_equal_loss_is_not_an_improvement() {
        let mut stopper = EarlyStopping::new(1);
        assert_eq!(stopper.observe(1, 0.5, ()), Progress::Improved);
        assert_eq!(stopper.observe(2, 0.5, ()), Progress::Stop);
    }

    #[test]
    fn test_improvement_resets_patience() {
        let mut stopper = EarlyStopping::new(2);
        stopper.observe(1, 1.0, ());
        assert_eq!(stopper.observe(2, 1.1, ()), Progress::Stalled { remaining: 1 });
        assert_eq!(stopper.observe(3, 0.7, ()), Progress::Improved);
        assert_eq!(stopper.observe(4, 0.9, ()), Progress::Stalled { remaining: 1 });
        assert_eq!(stopper.best().unwrap().epoch, 3);
    }
}
